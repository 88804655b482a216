use serde::{Deserialize, Serialize};

/// Cumulative received bytes of one network interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceCounter {
    pub name: String,
    pub received_bytes: u64,
}

/// Which interfaces count as uplinks for the throughput widget.
///
/// An interface is accepted if its name starts with one of `prefixes` or is
/// exactly one of `names`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceFilter {
    pub prefixes: Vec<String>,
    pub names: Vec<String>,
}

impl Default for InterfaceFilter {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            return Self {
                prefixes: vec!["en".into()],
                names: vec!["bridge0".into()],
            };
        }

        Self {
            prefixes: vec!["en".into(), "eth".into(), "wl".into()],
            names: vec![],
        }
    }
}

impl InterfaceFilter {
    pub fn accepts(&self, name: &str) -> bool {
        self.names.iter().any(|allowed| allowed == name)
            || self
                .prefixes
                .iter()
                .any(|prefix| !prefix.is_empty() && name.starts_with(prefix.as_str()))
    }

    pub fn total_received(&self, counters: &[InterfaceCounter]) -> u64 {
        counters
            .iter()
            .filter(|counter| self.accepts(&counter.name))
            .map(|counter| counter.received_bytes)
            .fold(0u64, u64::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(name: &str, received_bytes: u64) -> InterfaceCounter {
        InterfaceCounter {
            name: name.into(),
            received_bytes,
        }
    }

    #[test]
    fn only_allowed_interfaces_are_summed() {
        let filter = InterfaceFilter {
            prefixes: vec!["en".into()],
            names: vec!["bridge0".into()],
        };
        let counters = vec![
            counter("lo0", 1_000_000),
            counter("en0", 100),
            counter("en1", 20),
            counter("bridge0", 3),
            counter("bridge1", 4_000),
            counter("utun2", 50_000),
        ];
        assert_eq!(filter.total_received(&counters), 123);
    }

    #[test]
    fn empty_prefix_does_not_match_everything() {
        let filter = InterfaceFilter {
            prefixes: vec!["".into()],
            names: vec![],
        };
        assert!(!filter.accepts("lo"));
    }
}
