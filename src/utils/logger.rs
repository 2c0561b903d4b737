use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 終端機用的精簡格式
    Compact,
    /// JSON lines for headless runs where a shipper collects the output.
    Json,
}

impl LogFormat {
    pub fn from_flag(json_logs: bool) -> Self {
        if json_logs {
            LogFormat::Json
        } else {
            LogFormat::Compact
        }
    }
}

/// `RUST_LOG` wins over the built-in directive.
fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "food_order=debug,info"
    } else {
        "food_order=info"
    }
}

pub fn init_logger(format: LogFormat, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(layer.compact())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_flag() {
        assert_eq!(LogFormat::from_flag(true), LogFormat::Json);
        assert_eq!(LogFormat::from_flag(false), LogFormat::Compact);
    }

    #[test]
    fn test_verbose_enables_crate_debug() {
        assert_eq!(default_directive(false), "food_order=info");
        assert!(default_directive(true).starts_with("food_order=debug"));
    }
}
