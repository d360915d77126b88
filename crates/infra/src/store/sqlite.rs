//! SQLite-backed product and order store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | SQLite constraint | StoreError |
//! |------------|-------------------|------------|
//! | Database (unique) | `UNIQUE` on `products.sku` | `Conflict` |
//! | Database (foreign key) | `order_items.product_id` `ON DELETE RESTRICT` | `Conflict` |
//! | Database (check) | non-negative amounts, positive quantities | `Conflict` |
//! | Database (other) / PoolClosed / Other | n/a | `Database` |
//!
//! Listing order is `ORDER BY id ASC`, so repeated identical requests over
//! unchanged data return identical slices.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection};
use tracing::{debug, instrument};

use storeadmin_core::{Currency, DomainError, Money, OrderId, OrderItemId, PageWindow, ProductId};
use storeadmin_products::query::like_pattern;
use storeadmin_products::{
    adjust_inventory, ensure_sku_available, NewProduct, Product, ProductChanges, ProductFilter,
    ProductQuery,
};
use storeadmin_sales::{NewOrder, Order, OrderChanges, OrderItem, OrderStatus};

use super::repository::{OrderRepository, ProductRepository, StoreError, StoreResult};
use super::schema::SCHEMA;

/// Connections kept for a file-backed database.
const FILE_POOL_SIZE: u32 = 5;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `url` and ensure the schema.
    ///
    /// An in-memory database lives only as long as its connection, so it is
    /// served by a single connection that is never recycled.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| map_sqlx_error("connect", e))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = if url.contains(":memory:") || url.contains("mode=memory") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(FILE_POOL_SIZE)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Fresh private database, mostly for tests.
    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        Ok(())
    }

    async fn begin(&self, operation: &str) -> StoreResult<sqlx::Transaction<'static, sqlx::Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(operation, e))
    }
}

#[async_trait]
impl ProductRepository for SqliteStore {
    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&self, id: ProductId) -> StoreResult<Product> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        fetch_product(&mut conn, id)
            .await?
            .ok_or_else(|| StoreError::product_not_found(id))
    }

    #[instrument(skip(self), err)]
    async fn find_product_by_sku(&self, sku: &str) -> StoreResult<Option<Product>> {
        let row = sqlx::query("SELECT * FROM products WHERE sku = ?1")
            .bind(sku)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_product_by_sku", e))?;
        row.map(|row| product_from_row(&row))
            .transpose()
            .map_err(|e| map_sqlx_error("find_product_by_sku", e))
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
        let (active, category, pattern) = match &query.filter {
            ProductFilter::All => (None, None, None),
            ProductFilter::Active(active) => (Some(*active), None, None),
            ProductFilter::Category(category) => (None, Some(category.as_str()), None),
            ProductFilter::Search(term) => (None, None, Some(like_pattern(term))),
        };
        let (limit, offset) = window_binds(query.window)?;

        let rows = sqlx::query(
            r#"
            SELECT * FROM products
            WHERE (?1 IS NULL OR is_active = ?1)
                AND (?2 IS NULL OR category = ?2)
                AND (?3 IS NULL
                    OR lower(name) LIKE ?3 ESCAPE '\'
                    OR lower(COALESCE(description, '')) LIKE ?3 ESCAPE '\')
            ORDER BY id ASC
            LIMIT ?4 OFFSET ?5
            "#,
        )
        .bind(active)
        .bind(category)
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter()
            .map(product_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_products", e))
    }

    #[instrument(skip(self, input), fields(sku = %input.sku), err)]
    async fn create_product(&self, input: NewProduct) -> StoreResult<Product> {
        input.validate()?;
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO products (
                name, description, price, price_currency, inventory_count, sku,
                category, image_url, weight, dimensions, is_active, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(db_int("price", input.price.amount)?)
        .bind(input.price.currency.as_str())
        .bind(i64::from(input.inventory_count))
        .bind(&input.sku)
        .bind(&input.category)
        .bind(&input.image_url)
        .bind(input.weight.map(i64::from))
        .bind(&input.dimensions)
        .bind(input.is_active)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match map_sqlx_error("create_product", e) {
            StoreError::Conflict(_) => sku_conflict(&input.sku),
            other => other,
        })?;

        let id = ProductId::from_raw(result.last_insert_rowid());
        debug!(product_id = %id, "product created");
        Ok(input.into_product(id, now))
    }

    #[instrument(skip(self, changes), fields(product_id = %id), err)]
    async fn update_product(&self, id: ProductId, changes: ProductChanges) -> StoreResult<Product> {
        changes.validate()?;
        let mut tx = self.begin("update_product").await?;
        let mut product = fetch_product(&mut tx, id)
            .await?
            .ok_or_else(|| StoreError::product_not_found(id))?;

        if let Some(sku) = changes.new_sku(&product) {
            let owner = fetch_product_id_by_sku(&mut tx, sku).await?;
            ensure_sku_available(sku, owner, id)?;
        }
        changes.apply_to(&mut product, Utc::now());

        sqlx::query(
            r#"
            UPDATE products SET
                name = ?1, description = ?2, price = ?3, price_currency = ?4,
                inventory_count = ?5, sku = ?6, category = ?7, image_url = ?8,
                weight = ?9, dimensions = ?10, is_active = ?11, updated_at = ?12
            WHERE id = ?13
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(db_int("price", product.price.amount)?)
        .bind(product.price.currency.as_str())
        .bind(i64::from(product.inventory_count))
        .bind(&product.sku)
        .bind(&product.category)
        .bind(&product.image_url)
        .bind(product.weight.map(i64::from))
        .bind(&product.dimensions)
        .bind(product.is_active)
        .bind(product.updated_at)
        .bind(id.get())
        .execute(&mut *tx)
        .await
        .map_err(|e| match map_sqlx_error("update_product", e) {
            StoreError::Conflict(_) => sku_conflict(&product.sku),
            other => other,
        })?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;
        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> StoreResult<Product> {
        let mut tx = self.begin("delete_product").await?;
        let product = fetch_product(&mut tx, id)
            .await?
            .ok_or_else(|| StoreError::product_not_found(id))?;

        let refs: i64 = sqlx::query("SELECT COUNT(*) AS refs FROM order_items WHERE product_id = ?1")
            .bind(id.get())
            .fetch_one(&mut *tx)
            .await
            .and_then(|row| row.try_get("refs"))
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        if refs > 0 {
            return Err(StoreError::Conflict(format!(
                "product {id} is referenced by existing orders"
            )));
        }

        sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn adjust_inventory(&self, id: ProductId, delta: i64) -> StoreResult<Product> {
        let mut tx = self.begin("adjust_inventory").await?;
        let mut product = fetch_product(&mut tx, id)
            .await?
            .ok_or_else(|| StoreError::product_not_found(id))?;
        product.inventory_count = adjust_inventory(product.inventory_count, delta);
        product.updated_at = Utc::now();
        write_inventory(&mut tx, &product).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("adjust_inventory", e))?;
        Ok(product)
    }
}

#[async_trait]
impl OrderRepository for SqliteStore {
    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn get_order(&self, id: OrderId) -> StoreResult<Order> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?;
        fetch_order(&mut conn, id)
            .await?
            .ok_or_else(|| StoreError::order_not_found(id))
    }

    #[instrument(skip(self), err)]
    async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        window: PageWindow,
    ) -> StoreResult<Vec<Order>> {
        let (limit, offset) = window_binds(window)?;
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;
        let rows = sqlx::query(
            r#"
            SELECT * FROM orders
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY id ASC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("list_orders", e))?;

        hydrate_orders(&mut conn, rows).await
    }

    #[instrument(skip(self), err)]
    async fn list_orders_by_customer(&self, email: &str, window: PageWindow) -> StoreResult<Vec<Order>> {
        let (limit, offset) = window_binds(window)?;
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("list_orders_by_customer", e))?;
        let rows = sqlx::query(
            "SELECT * FROM orders WHERE customer_email = ?1 ORDER BY id ASC LIMIT ?2 OFFSET ?3",
        )
        .bind(email)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("list_orders_by_customer", e))?;

        hydrate_orders(&mut conn, rows).await
    }

    #[instrument(skip(self, input), fields(items = input.items.len()), err)]
    async fn create_order(&self, input: NewOrder) -> StoreResult<Order> {
        input.validate()?;
        let mut tx = self.begin("create_order").await?;

        let mut products = HashMap::with_capacity(input.items.len());
        for line in &input.items {
            if let Some(product) = fetch_product(&mut tx, line.product_id).await? {
                products.insert(product.id, product);
            }
        }
        let (lines, total) =
            input.price_lines(|id| products.get(&id).map(Product::unit_price))?;

        let now = Utc::now();
        let customer = &input.customer;
        let result = sqlx::query(
            r#"
            INSERT INTO orders (
                status, total_amount, customer_name, customer_email, customer_phone,
                shipping_address, billing_address, payment_method, payment_id, notes,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(input.status.as_str())
        .bind(db_int("total_amount", total)?)
        .bind(&customer.customer_name)
        .bind(&customer.customer_email)
        .bind(&customer.customer_phone)
        .bind(&customer.shipping_address)
        .bind(&customer.billing_address)
        .bind(&customer.payment_method)
        .bind(&customer.payment_id)
        .bind(&customer.notes)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_order", e))?;
        let order_id = OrderId::from_raw(result.last_insert_rowid());

        for line in &lines {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    order_id, product_id, quantity, unit_price, subtotal, created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(order_id.get())
            .bind(line.product_id.get())
            .bind(i64::from(line.quantity))
            .bind(db_int("unit_price", line.unit_price)?)
            .bind(db_int("subtotal", line.subtotal)?)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("create_order", e))?;

            if let Some(product) = products.get_mut(&line.product_id) {
                product.inventory_count =
                    adjust_inventory(product.inventory_count, -i64::from(line.quantity));
                product.updated_at = now;
                write_inventory(&mut tx, product).await?;
            }
        }

        let order = fetch_order(&mut tx, order_id)
            .await?
            .ok_or_else(|| StoreError::order_not_found(order_id))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("create_order", e))?;
        debug!(order_id = %order_id, total_amount = total, "order created");
        Ok(order)
    }

    #[instrument(skip(self, changes), fields(order_id = %id), err)]
    async fn update_order(&self, id: OrderId, changes: OrderChanges) -> StoreResult<Order> {
        changes.validate()?;
        let mut tx = self.begin("update_order").await?;
        let mut order = fetch_order(&mut tx, id)
            .await?
            .ok_or_else(|| StoreError::order_not_found(id))?;
        changes.apply_to(&mut order, Utc::now());

        sqlx::query(
            r#"
            UPDATE orders SET
                status = ?1, customer_name = ?2, customer_email = ?3, customer_phone = ?4,
                shipping_address = ?5, billing_address = ?6, payment_method = ?7,
                payment_id = ?8, notes = ?9, updated_at = ?10
            WHERE id = ?11
            "#,
        )
        .bind(order.status.as_str())
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(&order.customer_phone)
        .bind(&order.shipping_address)
        .bind(&order.billing_address)
        .bind(&order.payment_method)
        .bind(&order.payment_id)
        .bind(&order.notes)
        .bind(order.updated_at)
        .bind(id.get())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_order", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update_order", e))?;
        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn delete_order(&self, id: OrderId) -> StoreResult<Order> {
        let mut tx = self.begin("delete_order").await?;
        let order = fetch_order(&mut tx, id)
            .await?
            .ok_or_else(|| StoreError::order_not_found(id))?;
        sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_order", e))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("delete_order", e))?;
        Ok(order)
    }
}

async fn fetch_product(conn: &mut SqliteConnection, id: ProductId) -> StoreResult<Option<Product>> {
    let row = sqlx::query("SELECT * FROM products WHERE id = ?1")
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("fetch_product", e))?;
    row.map(|row| product_from_row(&row))
        .transpose()
        .map_err(|e| map_sqlx_error("fetch_product", e))
}

async fn fetch_product_id_by_sku(
    conn: &mut SqliteConnection,
    sku: &str,
) -> StoreResult<Option<ProductId>> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE sku = ?1")
        .bind(sku)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("fetch_product_id_by_sku", e))?;
    Ok(id.map(ProductId::from_raw))
}

async fn write_inventory(conn: &mut SqliteConnection, product: &Product) -> StoreResult<()> {
    sqlx::query("UPDATE products SET inventory_count = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(i64::from(product.inventory_count))
        .bind(product.updated_at)
        .bind(product.id.get())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("write_inventory", e))?;
    Ok(())
}

async fn fetch_order(conn: &mut SqliteConnection, id: OrderId) -> StoreResult<Option<Order>> {
    let row = sqlx::query("SELECT * FROM orders WHERE id = ?1")
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("fetch_order", e))?;
    match row {
        Some(row) => Ok(Some(hydrate_order(conn, &row).await?)),
        None => Ok(None),
    }
}

async fn hydrate_orders(conn: &mut SqliteConnection, rows: Vec<SqliteRow>) -> StoreResult<Vec<Order>> {
    let mut orders = Vec::with_capacity(rows.len());
    for row in &rows {
        orders.push(hydrate_order(conn, row).await?);
    }
    Ok(orders)
}

async fn hydrate_order(conn: &mut SqliteConnection, row: &SqliteRow) -> StoreResult<Order> {
    let mut order = order_from_row(row).map_err(|e| map_sqlx_error("hydrate_order", e))?;
    let items = sqlx::query("SELECT * FROM order_items WHERE order_id = ?1 ORDER BY id ASC")
        .bind(order.id.get())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("hydrate_order", e))?;
    order.items = items
        .iter()
        .map(order_item_from_row)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| map_sqlx_error("hydrate_order", e))?;
    Ok(order)
}

// Row mapping

fn product_from_row(row: &SqliteRow) -> Result<Product, sqlx::Error> {
    let currency: String = row.try_get("price_currency")?;
    let currency = Currency::parse(&currency).map_err(decode_error)?;
    let weight: Option<i64> = row.try_get("weight")?;
    Ok(Product {
        id: ProductId::from_raw(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: Money::new(unsigned("price", row.try_get("price")?)?, currency),
        inventory_count: unsigned("inventory_count", row.try_get("inventory_count")?)?,
        sku: row.try_get("sku")?,
        category: row.try_get("category")?,
        image_url: row.try_get("image_url")?,
        weight: weight.map(|w| unsigned("weight", w)).transpose()?,
        dimensions: row.try_get("dimensions")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn order_from_row(row: &SqliteRow) -> Result<Order, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(Order {
        id: OrderId::from_raw(row.try_get("id")?),
        status: OrderStatus::from_str(&status).map_err(decode_error)?,
        total_amount: unsigned("total_amount", row.try_get("total_amount")?)?,
        customer_name: row.try_get("customer_name")?,
        customer_email: row.try_get("customer_email")?,
        customer_phone: row.try_get("customer_phone")?,
        shipping_address: row.try_get("shipping_address")?,
        billing_address: row.try_get("billing_address")?,
        payment_method: row.try_get("payment_method")?,
        payment_id: row.try_get("payment_id")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        items: Vec::new(),
    })
}

fn order_item_from_row(row: &SqliteRow) -> Result<OrderItem, sqlx::Error> {
    Ok(OrderItem {
        id: OrderItemId::from_raw(row.try_get("id")?),
        order_id: OrderId::from_raw(row.try_get("order_id")?),
        product_id: ProductId::from_raw(row.try_get("product_id")?),
        quantity: unsigned("quantity", row.try_get("quantity")?)?,
        unit_price: unsigned("unit_price", row.try_get("unit_price")?)?,
        subtotal: unsigned("subtotal", row.try_get("subtotal")?)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn unsigned<T: TryFrom<i64>>(column: &str, value: i64) -> Result<T, sqlx::Error> {
    T::try_from(value)
        .map_err(|_| sqlx::Error::Decode(format!("column {column} holds out-of-range value {value}").into()))
}

fn decode_error(err: DomainError) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

/// SQLite stores integers as i64; amounts beyond that are rejected up front.
fn db_int(field: &str, value: u64) -> StoreResult<i64> {
    i64::try_from(value)
        .map_err(|_| DomainError::validation(format!("{field} is out of range")).into())
}

fn window_binds(window: PageWindow) -> StoreResult<(i64, i64)> {
    Ok((i64::from(window.limit), db_int("skip", window.skip)?))
}

fn sku_conflict(sku: &str) -> StoreError {
    StoreError::Conflict(format!("product with SKU {sku} already exists"))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            if db_err.is_unique_violation() {
                StoreError::Conflict("a record with the same unique value already exists".to_string())
            } else if db_err.is_foreign_key_violation() {
                StoreError::Conflict("record is referenced by other records".to_string())
            } else if db_err.is_check_violation() {
                StoreError::Conflict("value violates a storage constraint".to_string())
            } else {
                StoreError::Database(msg)
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Database(format!("sqlx error in {operation}: {other}")),
    }
}
