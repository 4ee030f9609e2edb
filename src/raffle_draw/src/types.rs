pub type Salt = [u8; 32];

/// One raw ticket purchase as handed over by the ingestion side.
#[derive(candid::CandidType, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicketEntry {
    pub prize: String,
    pub buyer: String,
    pub quantity: i64,
}

impl TicketEntry {
    pub fn new(prize: impl Into<String>, buyer: impl Into<String>, quantity: i64) -> Self {
        TicketEntry {
            prize: prize.into(),
            buyer: buyer.into(),
            quantity,
        }
    }
}

#[derive(candid::CandidType, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuyerTickets {
    pub buyer: String,
    pub tickets: u64,
}

#[derive(candid::CandidType, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrizeTickets {
    pub prize: String,
    pub buyers: Vec<BuyerTickets>,
}

#[derive(candid::CandidType, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WinnerRecord {
    pub prize: String,
    pub buyer: String,
    // slot drawn and the pool size it was drawn from
    pub slot: u64,
    pub pool_size: u64,
}

#[derive(candid::CandidType, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditRow {
    pub prize: String,
    pub buyer: String,
    pub tickets: u64,
}

#[derive(candid::CandidType, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WinnerRow {
    pub prize: String,
    pub winner: String,
}

/// Per-prize, per-buyer ticket counts in first-seen order.
#[derive(candid::CandidType, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicketSummary {
    pub prizes: Vec<PrizeTickets>,
}

impl TicketSummary {
    pub fn prize(&self, prize: &str) -> Option<&PrizeTickets> {
        self.prizes.iter().find(|p| p.prize == prize)
    }

    pub fn tickets(&self, prize: &str, buyer: &str) -> u64 {
        self.prize(prize)
            .and_then(|p| p.buyers.iter().find(|b| b.buyer == buyer))
            .map(|b| b.tickets)
            .unwrap_or(0)
    }

    pub fn total_tickets(&self, prize: &str) -> u64 {
        match self.prize(prize) {
            Some(p) => p.buyers.iter().map(|b| b.tickets).sum(),
            None => 0,
        }
    }

    pub fn prize_names(&self) -> impl Iterator<Item = &str> {
        self.prizes.iter().map(|p| p.prize.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.prizes.is_empty()
    }
}

/// Audit summary plus exactly one winner per prize, in summary order.
#[derive(candid::CandidType, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DrawResult {
    pub summary: TicketSummary,
    pub winners: Vec<WinnerRecord>,
}

impl DrawResult {
    pub fn winner(&self, prize: &str) -> Option<&str> {
        self.winners
            .iter()
            .find(|w| w.prize == prize)
            .map(|w| w.buyer.as_str())
    }
}
