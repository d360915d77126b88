//! Request sequencing.
//!
//! Every fetch takes a ticket; only the newest ticket's outcome is applied.

/// A fetch in flight, carrying the request it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket<R> {
    seq: u64,
    request: R,
}

impl<R> FetchTicket<R> {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn request(&self) -> &R {
        &self.request
    }
}

#[derive(Debug, Default)]
pub(crate) struct Sequencer {
    latest: u64,
}

impl Sequencer {
    pub(crate) fn issue<R>(&mut self, request: R) -> FetchTicket<R> {
        self.latest += 1;
        FetchTicket {
            seq: self.latest,
            request,
        }
    }

    pub(crate) fn is_current<R>(&self, ticket: &FetchTicket<R>) -> bool {
        ticket.seq == self.latest
    }
}
