use std::io::{self, BufWriter, Write};

use anyhow::Context;
use nodeflake::{LockSnowflakeGenerator, decode_parts};

use crate::config::{DecodeArgs, GenerateConfig};

/// Issues `config.count` IDs and writes them to `out`, one per line.
pub fn generate(config: &GenerateConfig, out: impl Write) -> anyhow::Result<()> {
    let generator = LockSnowflakeGenerator::from_config(config.generator)
        .context("failed to create generator")?;

    tracing::info!(
        datacenter_id = generator.datacenter_id(),
        worker_id = generator.worker_id(),
        count = config.count,
        "issuing ids"
    );

    let mut out = BufWriter::new(out);
    for issued in 0..config.count {
        let id = generator
            .next_id()
            .with_context(|| format!("stopped after issuing {issued} ids"))?;
        if config.padded {
            writeln!(out, "{}", id.to_padded_string())?;
        } else {
            writeln!(out, "{id}")?;
        }
    }
    out.flush()?;

    tracing::debug!(count = config.count, "done");
    Ok(())
}

/// Writes the fields of every ID in `args`, as a table or as JSON lines.
pub fn decode(args: &DecodeArgs, out: impl Write) -> anyhow::Result<()> {
    let mut out = BufWriter::new(out);
    if !args.json {
        writeln!(
            out,
            "{:>20} {:>14} {:>10} {:>6} {:>8}",
            "id", "timestamp", "datacenter", "worker", "sequence"
        )?;
    }

    for &raw in &args.ids {
        if raw < 0 {
            tracing::warn!(id = raw, "sign bit set, not issued by a nodeflake generator");
        }
        let parts = decode_parts(raw);
        if args.json {
            let line = serde_json::json!({ "id": raw, "parts": parts });
            writeln!(out, "{line}")?;
        } else {
            writeln!(
                out,
                "{:>20} {:>14} {:>10} {:>6} {:>8}",
                raw, parts.timestamp, parts.datacenter_id, parts.worker_id, parts.sequence
            )?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Convenience used by `main` to write to a locked stdout.
pub fn stdout() -> io::StdoutLock<'static> {
    io::stdout().lock()
}
