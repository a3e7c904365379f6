use std::sync::OnceLock;

/// Phase filter parsed once from `AKANE_TRACE`: unset/`0` disables, `1`
/// enables every phase, a comma list selects phases (`lex,parse`).
enum TraceConfig {
    Off,
    All,
    Phases(Vec<String>),
}

impl TraceConfig {
    fn parse(value: &str) -> Self {
        match value {
            "" | "0" => TraceConfig::Off,
            "1" => TraceConfig::All,
            list => TraceConfig::Phases(list.split(',').map(str::to_string).collect()),
        }
    }

    fn enabled(&self, phase: &str) -> bool {
        match self {
            TraceConfig::Off => false,
            TraceConfig::All => true,
            TraceConfig::Phases(phases) => phases.iter().any(|p| p == phase),
        }
    }
}

static TRACE_CONFIG: OnceLock<TraceConfig> = OnceLock::new();

pub fn is_enabled(phase: &str) -> bool {
    TRACE_CONFIG
        .get_or_init(|| TraceConfig::parse(&std::env::var("AKANE_TRACE").unwrap_or_default()))
        .enabled(phase)
}

macro_rules! trace_log {
    ($phase:expr, $($arg:tt)*) => {
        if $crate::trace::is_enabled($phase) {
            eprintln!("[TRACE:{}] {}", $phase, format!($($arg)*));
        }
    };
}
pub(crate) use trace_log;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_and_zero_disable() {
        assert!(!TraceConfig::parse("").enabled("lex"));
        assert!(!TraceConfig::parse("0").enabled("lex"));
    }

    #[test]
    fn test_one_enables_everything() {
        let config = TraceConfig::parse("1");
        assert!(config.enabled("lex"));
        assert!(config.enabled("call"));
    }

    #[test]
    fn test_comma_list_selects_phases() {
        let config = TraceConfig::parse("lex,parse");
        assert!(config.enabled("lex"));
        assert!(config.enabled("parse"));
        assert!(!config.enabled("eval"));
    }
}
