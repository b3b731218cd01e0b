// Consumer logger setup

use taskwire_core::domain::LoggingConfig;
use taskwire_core::error::{AppError, Result};
use tracing::debug;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::{Filtered, LevelFilter};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    Json,
    Simple,
}

/// Install the global subscriber for a consumer process
///
/// `RUST_LOG` wins over the consumer's verbosity. `TASKWIRE_LOG_FORMAT=json`
/// switches to structured output unless `simple` is set.
///
/// Returns `false` when a subscriber was already installed; that one stays.
pub fn init_consumer_logging(logging: &LoggingConfig) -> Result<bool> {
    match tracing_subscriber::registry().with(consumer_layer(logging)?).try_init() {
        Ok(()) => Ok(true),
        Err(e) => {
            debug!(error = %e, "Subscriber already installed; keeping it");
            Ok(false)
        }
    }
}

// Output layer for the consumer: stdout, or the logfile when one is set
fn consumer_layer(logging: &LoggingConfig) -> Result<Filtered<BoxedLayer, EnvFilter, Registry>> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(logging.level).into())
        .from_env_lossy();

    let format = if logging.simple {
        LogFormat::Simple
    } else if std::env::var("TASKWIRE_LOG_FORMAT").as_deref() == Ok("json") {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };

    let layer = match &logging.logfile {
        Some(path) => {
            let file_name = path
                .file_name()
                .ok_or_else(|| AppError::Config(format!("logfile '{}' has no file name", path.display())))?;
            let dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));

            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(file_name.to_string_lossy())
                .build(dir)
                .map_err(|e| AppError::Config(format!("cannot open logfile '{}': {}", path.display(), e)))?;
            fmt_layer(appender, false, format)
        }
        None => fmt_layer(std::io::stdout, true, format),
    };

    Ok(layer.with_filter(filter))
}

fn fmt_layer<W>(writer: W, ansi: bool, format: LogFormat) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_writer(writer).with_ansi(ansi);
    match format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Simple => layer.compact().without_time().with_target(false).boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_second_install_keeps_first_subscriber() {
        let logging = LoggingConfig {
            level: Level::INFO,
            logfile: None,
            simple: true,
        };
        init_consumer_logging(&logging).unwrap();
        assert!(!init_consumer_logging(&logging).unwrap());
    }

    #[test]
    fn test_logfile_receives_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("consumer.log");
        let logging = LoggingConfig {
            level: Level::INFO,
            logfile: Some(path.clone()),
            simple: true,
        };

        let subscriber = tracing_subscriber::registry().with(consumer_layer(&logging).unwrap());
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(queue = "reports", "Worker died");
        });

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("Worker died"));
        assert!(written.contains("reports"));
    }

    #[test]
    fn test_logfile_without_name_is_rejected() {
        let logging = LoggingConfig {
            level: Level::INFO,
            logfile: Some("/".into()),
            simple: false,
        };
        assert!(matches!(
            init_consumer_logging(&logging).unwrap_err(),
            AppError::Config(_)
        ));
    }
}
