use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the stderr subscriber. stdout is reserved for protocol lines.
///
/// `GRADEBOOK_LOG` (or `RUST_LOG`) overrides `level` when set.
pub fn init_tracing(level: &str, log_json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env("GRADEBOOK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| {
            EnvFilter::new(if level.contains('=') {
                level.to_string()
            } else {
                format!("gradebookd={level}")
            })
        });

    let registry = tracing_subscriber::registry().with(filter);

    if log_json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    }

    Ok(())
}
