//! SQLite schema, created idempotently at startup.

/// Statements run one at a time, in order.
pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT,
        price INTEGER NOT NULL CHECK (price >= 0),
        price_currency TEXT NOT NULL DEFAULT 'USD',
        inventory_count INTEGER NOT NULL DEFAULT 0 CHECK (inventory_count >= 0),
        sku TEXT NOT NULL UNIQUE,
        category TEXT,
        image_url TEXT,
        weight INTEGER,
        dimensions TEXT,
        is_active BOOLEAN NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_products_category ON products (category)",
    "CREATE INDEX IF NOT EXISTS idx_products_name ON products (name)",
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        status TEXT NOT NULL DEFAULT 'pending',
        total_amount INTEGER NOT NULL CHECK (total_amount >= 0),
        customer_name TEXT NOT NULL,
        customer_email TEXT NOT NULL,
        customer_phone TEXT,
        shipping_address TEXT,
        billing_address TEXT,
        payment_method TEXT,
        payment_id TEXT,
        notes TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_orders_status ON orders (status)",
    "CREATE INDEX IF NOT EXISTS idx_orders_customer_email ON orders (customer_email)",
    r#"
    CREATE TABLE IF NOT EXISTS order_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        order_id INTEGER NOT NULL REFERENCES orders (id) ON DELETE CASCADE,
        product_id INTEGER NOT NULL REFERENCES products (id) ON DELETE RESTRICT,
        quantity INTEGER NOT NULL CHECK (quantity > 0),
        unit_price INTEGER NOT NULL CHECK (unit_price >= 0),
        subtotal INTEGER NOT NULL CHECK (subtotal >= 0),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (order_id, product_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_order_items_product ON order_items (product_id)",
];
