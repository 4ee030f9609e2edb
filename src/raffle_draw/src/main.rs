use log::{debug, info};
use raffle_draw::config::DrawConfig;
use raffle_draw::{
    draw, draw_concurrent, ingest, report, ChaChaSource, DrawResult, ExportError, SharedSource,
};
use std::io::Write;

fn main() -> Result<(), ExportError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => DrawConfig::load(path)?,
        None => DrawConfig::default(),
    };

    let entries = ingest::read_entries_from(&config.input)?;
    info!("read {} entries from {}", entries.len(), config.input.display());

    // pick a source: fixed seed for reruns, entropy otherwise
    let source = match config.seed {
        Some(seed) => ChaChaSource::from_seed_u64(seed),
        None => ChaChaSource::from_entropy().map_err(raffle_draw::DrawError::from)?,
    };

    let result = if config.concurrent {
        draw_concurrent(&entries, SharedSource::new(source))?
    } else {
        let mut source = source;
        draw(&entries, &mut source)?
    };
    announce(&result);

    // open every sink before writing so a bad path leaves no half-written output
    let audit = report::create_sink(&config.audit_output)?;
    let winners = report::create_sink(&config.winners_output)?;
    let json = match &config.result_json {
        Some(path) => Some(report::create_sink(path)?),
        None => None,
    };

    report::write_audit_csv(audit, &result.summary)?;
    report::write_winners_csv(winners, &result)?;
    if let Some(mut json) = json {
        json.write_all(report::to_json(&result)?.as_bytes())?;
        json.flush()?;
    }

    info!(
        "wrote {} and {}",
        config.audit_output.display(),
        config.winners_output.display()
    );
    Ok(())
}

fn announce(result: &DrawResult) {
    for prize in &result.summary.prizes {
        info!("tickets for the {} prize:", prize.prize);
        for buyer in &prize.buyers {
            info!("  {} holds {} tickets", buyer.buyer, buyer.tickets);
        }
    }
    for winner in &result.winners {
        debug!(
            "{}: slot {} of {}",
            winner.prize, winner.slot, winner.pool_size
        );
        info!("the winner of the {} prize is {}", winner.prize, winner.buyer);
    }
}
