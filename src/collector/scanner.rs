// src/collector/scanner.rs
//! Marker-driven scanning for line-oriented summaries such as `netstat -s`.

use std::collections::HashMap;

/// Where the integer sits relative to the marker on a matching line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extract {
    /// First whitespace token of the line.
    Leading,
    /// Token immediately before the marker.
    BeforeMarker,
    /// Token immediately after the marker.
    AfterMarker,
}

/// Which hit wins when a marker matches several lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    First,
    Last,
}

/// One scanning rule: results are keyed by `field`.
#[derive(Debug, Clone)]
pub struct Rule {
    pub field: &'static str,
    pub marker: &'static str,
    pub extract: Extract,
    pub policy: Policy,
}

impl Rule {
    pub const fn leading(field: &'static str, marker: &'static str, policy: Policy) -> Self {
        Self {
            field,
            marker,
            extract: Extract::Leading,
            policy,
        }
    }

    fn extract(&self, line: &str) -> Option<i64> {
        let at = line.find(self.marker)?;
        let token = match self.extract {
            Extract::Leading => line.split_whitespace().next(),
            Extract::BeforeMarker => line[..at].split_whitespace().last(),
            Extract::AfterMarker => line[at + self.marker.len()..].split_whitespace().next(),
        }?;

        token.trim_end_matches(':').parse::<i64>().ok()
    }
}

/// Scan `text` once, applying every rule to every line. Rules that never
/// match (or only match lines without an integer in position) are absent
/// from the result.
pub fn scan(text: &str, rules: &[Rule]) -> HashMap<&'static str, i64> {
    let mut found = HashMap::new();

    for line in text.lines() {
        for rule in rules {
            if rule.policy == Policy::First && found.contains_key(rule.field) {
                continue;
            }
            if let Some(value) = rule.extract(line) {
                found.insert(rule.field, value);
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETSTAT: &str = "\
Ip:
    Forwarding: 2
    918273 total packets received
    0 forwarded
    812345 requests sent out
Tcp:
    1200 active connection openings
    14 connections established
    765432 segments received
    654321 segments sent out
Udp:
    5210 packets received
    4 packets to unknown port received
    5001 packets sent
UdpLite:
IpExt:
    InOctets: 1234
";

    #[test]
    fn test_leading_first_and_last() {
        let rules = [
            Rule::leading("tcp_outsegs", "segments sent out", Policy::First),
            Rule::leading("tcp_currestab", "connections established", Policy::First),
            Rule::leading("net_pps_receive", "packets received", Policy::Last),
            Rule::leading("net_pps_transmit", "packets sent", Policy::Last),
        ];
        let found = scan(NETSTAT, &rules);

        assert_eq!(found["tcp_outsegs"], 654321);
        assert_eq!(found["tcp_currestab"], 14);
        // "total packets received" is overwritten by the later Udp line
        assert_eq!(found["net_pps_receive"], 5210);
        assert_eq!(found["net_pps_transmit"], 5001);
    }

    #[test]
    fn test_first_policy_keeps_earliest() {
        let text = "10 packets received\n20 packets received\n";
        let rules = [Rule::leading("rx", "packets received", Policy::First)];

        assert_eq!(scan(text, &rules)["rx"], 10);
    }

    #[test]
    fn test_marker_relative_extraction() {
        let rules = [
            Rule {
                field: "in_octets",
                marker: "InOctets:",
                extract: Extract::AfterMarker,
                policy: Policy::First,
            },
            Rule {
                field: "forwarding",
                marker: "forwarded",
                extract: Extract::BeforeMarker,
                policy: Policy::First,
            },
        ];
        let found = scan(NETSTAT, &rules);

        assert_eq!(found["in_octets"], 1234);
        assert_eq!(found["forwarding"], 0);
    }

    #[test]
    fn test_non_integer_or_absent() {
        let rules = [
            Rule::leading("sent", "datagrams sent", Policy::First),
            Rule::leading("missing", "no such marker", Policy::First),
        ];
        let found = scan("    many datagrams sent\n", &rules);

        assert!(found.is_empty());
    }
}
