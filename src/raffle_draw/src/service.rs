use crate::error::{DrawError, EntryFault, RandomFault};
use crate::random::{RandomSource, SharedSource};
use crate::types::*;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::thread;

/// Weighted pool for one prize: one slot per ticket, each slot pointing at a buyer.
#[derive(Clone, Debug, Default)]
pub struct PrizePool {
    prize: String,
    buyers: Vec<String>,
    slots: Vec<usize>, // index into `buyers`, in arrival order
}

impl PrizePool {
    pub fn prize(&self) -> &str {
        &self.prize
    }

    pub fn len(&self) -> u64 {
        self.slots.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: u64) -> Option<&str> {
        let slot = usize::try_from(index).ok()?;
        self.slots
            .get(slot)
            .map(|&buyer| self.buyers[buyer].as_str())
    }
}

// running state for one prize while entries are being folded in
#[derive(Default)]
struct PrizeTally {
    pool: PrizePool,
    counts: Vec<u64>,
    buyer_index: HashMap<String, usize>,
}

/// Default cap on pool slots for one prize. Each slot costs one `usize`, so
/// the default keeps a single pool near 128 MiB on 64-bit targets.
pub const DEFAULT_TICKET_LIMIT: u64 = 1 << 24;

/// Folds ticket entries into per-prize pools and counts in a single pass.
///
/// Prizes and buyers keep first-seen order, which fixes both the pool's
/// index space and the row order of the audit. Every ticket occupies a pool
/// slot, so memory grows with the ticket total; entries that would push a
/// prize past the ticket limit are rejected with [`EntryFault::TicketLimit`].
pub struct Aggregator {
    tallies: Vec<PrizeTally>,
    prize_index: HashMap<String, usize>,
    // entries submitted so far, accepted or not
    submitted: usize,
    ticket_limit: u64,
}

impl Default for Aggregator {
    fn default() -> Self {
        Aggregator {
            tallies: Vec::new(),
            prize_index: HashMap::new(),
            submitted: 0,
            ticket_limit: DEFAULT_TICKET_LIMIT,
        }
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ticket_limit(mut self, limit: u64) -> Self {
        self.ticket_limit = limit;
        self
    }

    pub fn register(&mut self, entry: &TicketEntry) -> Result<(), DrawError> {
        let index = self.submitted;
        self.submitted += 1;
        let invalid = |fault| DrawError::InvalidEntry { index, fault };

        let prize = entry.prize.trim();
        let buyer = entry.buyer.trim();
        if prize.is_empty() {
            return Err(invalid(EntryFault::EmptyPrize));
        }
        if buyer.is_empty() {
            return Err(invalid(EntryFault::EmptyBuyer));
        }
        if entry.quantity < 1 {
            return Err(invalid(EntryFault::NonPositiveQuantity(entry.quantity)));
        }
        let quantity = entry.quantity as u64;
        let slots = usize::try_from(quantity).map_err(|_| invalid(EntryFault::TicketOverflow))?;

        // reject before touching any state so a failed entry leaves no trace
        let existing = self.prize_index.get(prize).copied();
        let current = existing.map_or(0, |pos| self.tallies[pos].pool.slots.len());
        let new_total = current
            .checked_add(slots)
            .ok_or_else(|| invalid(EntryFault::TicketOverflow))?;
        if new_total as u64 > self.ticket_limit {
            return Err(invalid(EntryFault::TicketLimit {
                limit: self.ticket_limit,
            }));
        }

        let mut fresh = PrizeTally::default();
        let target = match existing {
            Some(pos) => &mut self.tallies[pos],
            None => &mut fresh,
        };
        target
            .pool
            .slots
            .try_reserve(slots)
            .map_err(|_| invalid(EntryFault::TicketOverflow))?;

        let tally_pos = match existing {
            Some(pos) => pos,
            None => {
                fresh.pool.prize = prize.to_string();
                self.tallies.push(fresh);
                self.prize_index
                    .insert(prize.to_string(), self.tallies.len() - 1);
                self.tallies.len() - 1
            }
        };
        let tally = &mut self.tallies[tally_pos];

        let buyer_pos = match tally.buyer_index.get(buyer) {
            Some(&pos) => pos,
            None => {
                tally.pool.buyers.push(buyer.to_string());
                tally.counts.push(0);
                tally
                    .buyer_index
                    .insert(buyer.to_string(), tally.pool.buyers.len() - 1);
                tally.pool.buyers.len() - 1
            }
        };

        tally.pool.slots.resize(new_total, buyer_pos);
        tally.counts[buyer_pos] += quantity;
        Ok(())
    }

    pub fn extend<'a, I>(&mut self, entries: I) -> Result<(), DrawError>
    where
        I: IntoIterator<Item = &'a TicketEntry>,
    {
        for entry in entries {
            self.register(entry)?;
        }
        Ok(())
    }

    /// Hands back the pools for selection and the summary for reporting.
    pub fn finish(self) -> (Vec<PrizePool>, TicketSummary) {
        let mut pools = Vec::with_capacity(self.tallies.len());
        let mut summary = TicketSummary::default();
        for tally in self.tallies {
            let buyers = tally
                .pool
                .buyers
                .iter()
                .zip(tally.counts.iter())
                .map(|(buyer, &tickets)| BuyerTickets {
                    buyer: buyer.clone(),
                    tickets,
                })
                .collect();
            summary.prizes.push(PrizeTickets {
                prize: tally.pool.prize.clone(),
                buyers,
            });
            pools.push(tally.pool);
        }
        (pools, summary)
    }
}

/// Builds pools and summary from a full entry list, failing on the first bad entry.
pub fn aggregate(entries: &[TicketEntry]) -> Result<(Vec<PrizePool>, TicketSummary), DrawError> {
    let mut aggregator = Aggregator::new();
    aggregator.extend(entries)?;
    Ok(aggregator.finish())
}

/// Draws one slot uniformly from the pool and returns its occupant.
pub fn select_winner<S>(pool: &PrizePool, source: &mut S) -> Result<WinnerRecord, DrawError>
where
    S: RandomSource + ?Sized,
{
    if pool.is_empty() {
        return Err(DrawError::EmptyPool {
            prize: pool.prize.clone(),
        });
    }

    let pool_size = pool.len();
    let slot = source.draw(pool_size)?;
    let buyer = pool.slot(slot).ok_or(RandomFault::OutOfRange {
        value: slot,
        bound: pool_size,
    })?;

    Ok(WinnerRecord {
        prize: pool.prize.clone(),
        buyer: buyer.to_string(),
        slot,
        pool_size,
    })
}

/// Aggregate, then draw every prize in first-seen order from one source.
///
/// With a seeded source the whole result is reproducible for identical input order.
pub fn draw<S>(entries: &[TicketEntry], source: &mut S) -> Result<DrawResult, DrawError>
where
    S: RandomSource + ?Sized,
{
    let (pools, summary) = aggregate(entries)?;

    let winners = pools
        .iter()
        .map(|pool| select_winner(pool, &mut *source))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DrawResult { summary, winners })
}

/// Like [`draw`], but prizes are spread over a fixed set of scoped worker threads.
///
/// The worker count follows `available_parallelism`, so the thread count does
/// not grow with the number of prizes. Winners come back in summary order;
/// which random value each prize gets depends on lock order, so results are
/// not reproducible across runs.
pub fn draw_concurrent<S>(
    entries: &[TicketEntry],
    source: SharedSource<S>,
) -> Result<DrawResult, DrawError>
where
    S: RandomSource + Send,
{
    let (pools, summary) = aggregate(entries)?;
    if pools.is_empty() {
        return Ok(DrawResult {
            summary,
            winners: Vec::new(),
        });
    }

    let workers = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .min(pools.len());
    let chunk_size = (pools.len() + workers - 1) / workers;

    let chunks: Vec<Result<Vec<WinnerRecord>, DrawError>> = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for (n, chunk) in pools.chunks(chunk_size).enumerate() {
            let mut source = source.clone();
            let spawned = thread::Builder::new()
                .name(format!("draw-worker-{}", n))
                .spawn_scoped(scope, move || {
                    chunk
                        .iter()
                        .map(|pool| select_winner(pool, &mut source))
                        .collect::<Result<Vec<_>, _>>()
                });
            match spawned {
                Ok(handle) => handles.push(Ok(handle)),
                Err(e) => handles.push(Err(DrawError::from(RandomFault::Failed(format!(
                    "failed to start draw worker: {}",
                    e
                ))))),
            }
        }

        handles
            .into_iter()
            .map(|handle| match handle {
                Ok(handle) => handle.join().unwrap_or_else(|_| {
                    Err(RandomFault::Failed("draw worker panicked".to_string()).into())
                }),
                Err(e) => Err(e),
            })
            .collect()
    });

    let mut winners = Vec::with_capacity(pools.len());
    for chunk in chunks {
        winners.extend(chunk?);
    }
    Ok(DrawResult { summary, winners })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(u64);

    impl RandomSource for Fixed {
        fn draw(&mut self, _n: u64) -> Result<u64, RandomFault> {
            Ok(self.0)
        }
    }

    fn entries() -> Vec<TicketEntry> {
        vec![
            TicketEntry::new("Bike", "Alice", 3),
            TicketEntry::new("Bike", "Bob", 1),
            TicketEntry::new("Gift Card", "Alice", 2),
        ]
    }

    #[test]
    fn pool_has_one_slot_per_ticket_in_arrival_order() {
        let (pools, _) = aggregate(&entries()).unwrap();
        assert_eq!(pools.len(), 2);
        let bike = &pools[0];
        assert_eq!(bike.prize(), "Bike");
        assert_eq!(bike.len(), 4);
        let slots: Vec<&str> = (0..4).map(|i| bike.slot(i).unwrap()).collect();
        assert_eq!(slots, vec!["Alice", "Alice", "Alice", "Bob"]);
        assert_eq!(bike.slot(4), None);
    }

    #[test]
    fn names_are_trimmed_before_merging() {
        let input = vec![
            TicketEntry::new(" Bike ", "Alice", 1),
            TicketEntry::new("Bike", "  Alice", 2),
        ];
        let (pools, summary) = aggregate(&input).unwrap();
        assert_eq!(pools.len(), 1);
        assert_eq!(summary.tickets("Bike", "Alice"), 3);
        assert_eq!(summary.prizes[0].buyers.len(), 1);
    }

    #[test]
    fn rejected_entry_reports_its_index() {
        let input = vec![
            TicketEntry::new("Bike", "Alice", 1),
            TicketEntry::new("Bike", "   ", 1),
        ];
        assert_eq!(
            aggregate(&input).unwrap_err(),
            DrawError::InvalidEntry {
                index: 1,
                fault: EntryFault::EmptyBuyer
            }
        );
    }

    #[test]
    fn empty_prize_name_is_rejected() {
        let input = vec![TicketEntry::new("", "Alice", 1)];
        assert_eq!(
            aggregate(&input).unwrap_err(),
            DrawError::InvalidEntry {
                index: 0,
                fault: EntryFault::EmptyPrize
            }
        );
    }

    #[test]
    fn empty_pool_is_reported() {
        let pool = PrizePool {
            prize: "Ghost".to_string(),
            ..PrizePool::default()
        };
        assert_eq!(
            select_winner(&pool, &mut Fixed(0)).unwrap_err(),
            DrawError::EmptyPool {
                prize: "Ghost".to_string()
            }
        );
    }

    #[test]
    fn out_of_range_draw_is_not_clamped() {
        let (pools, _) = aggregate(&entries()).unwrap();
        assert_eq!(
            select_winner(&pools[0], &mut Fixed(4)).unwrap_err(),
            DrawError::RandomnessSource(RandomFault::OutOfRange { value: 4, bound: 4 })
        );
    }

    #[test]
    fn winner_records_slot_and_pool_size() {
        let (pools, _) = aggregate(&entries()).unwrap();
        let record = select_winner(&pools[0], &mut Fixed(3)).unwrap();
        assert_eq!(record.buyer, "Bob");
        assert_eq!(record.slot, 3);
        assert_eq!(record.pool_size, 4);
    }

    #[test]
    fn empty_input_draws_nothing() {
        let result = draw(&[], &mut Fixed(0)).unwrap();
        assert!(result.summary.is_empty());
        assert!(result.winners.is_empty());
    }

    #[test]
    fn error_index_counts_rejected_entries_too() {
        let mut aggregator = Aggregator::new();
        assert!(aggregator.register(&TicketEntry::new("Bike", " ", 1)).is_err());
        aggregator
            .register(&TicketEntry::new("Bike", "Alice", 1))
            .unwrap();
        assert_eq!(
            aggregator
                .register(&TicketEntry::new("Bike", "Bob", 0))
                .unwrap_err(),
            DrawError::InvalidEntry {
                index: 2,
                fault: EntryFault::NonPositiveQuantity(0)
            }
        );
        let (pools, summary) = aggregator.finish();
        assert_eq!(pools[0].len(), 1);
        assert_eq!(summary.tickets("Bike", "Alice"), 1);
    }

    #[test]
    fn ticket_limit_caps_each_prize() {
        let mut aggregator = Aggregator::new().with_ticket_limit(5);
        aggregator
            .register(&TicketEntry::new("Bike", "Alice", 3))
            .unwrap();
        aggregator
            .register(&TicketEntry::new("Quilt", "Bob", 5))
            .unwrap();
        assert_eq!(
            aggregator
                .register(&TicketEntry::new("Bike", "Bob", 3))
                .unwrap_err(),
            DrawError::InvalidEntry {
                index: 2,
                fault: EntryFault::TicketLimit { limit: 5 }
            }
        );
        let (pools, _) = aggregator.finish();
        assert_eq!(pools[0].len(), 3);
    }

    #[test]
    fn huge_quantity_is_refused_before_allocating() {
        let input = vec![TicketEntry::new("Bike", "Alice", 1_000_000_000)];
        assert_eq!(
            aggregate(&input).unwrap_err(),
            DrawError::InvalidEntry {
                index: 0,
                fault: EntryFault::TicketLimit {
                    limit: DEFAULT_TICKET_LIMIT
                }
            }
        );
    }
}
