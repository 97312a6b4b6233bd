//! ABAC condition evaluation.
//!
//! Conditions gate whether a policy *applies* to a request, not the
//! request itself: an unmet condition makes the evaluator skip the
//! policy and move on. All present keys must pass (AND semantics).
//! Malformed data fails closed — the condition is treated as not met
//! and evaluation of the remaining policies continues.

use std::net::IpAddr;

use chrono::{NaiveTime, Utc};
use ipnet::IpNet;
use tracing::warn;
use warden_core::models::policy::PolicyConditions;

/// Evaluate conditions against the current UTC wall-clock time.
pub fn conditions_met(conditions: &PolicyConditions, ip_address: Option<&str>) -> bool {
    conditions_met_at(conditions, ip_address, Utc::now().time())
}

/// Evaluate conditions at an explicit time of day. Pure; exposed so
/// time-window behavior is testable without clock control.
pub fn conditions_met_at(
    conditions: &PolicyConditions,
    ip_address: Option<&str>,
    now: NaiveTime,
) -> bool {
    if let Some(time_range) = &conditions.time_range {
        let (Ok(start), Ok(end)) = (
            NaiveTime::parse_from_str(&time_range.start, "%H:%M"),
            NaiveTime::parse_from_str(&time_range.end, "%H:%M"),
        ) else {
            warn!(
                start = %time_range.start,
                end = %time_range.end,
                "Invalid time_range condition"
            );
            return false;
        };

        let in_range = if start <= end {
            // Normal range, e.g. 09:00..18:00 (inclusive start,
            // exclusive end).
            start <= now && now < end
        } else {
            // Overnight range, e.g. 22:00..06:00.
            now >= start || now < end
        };
        if !in_range {
            return false;
        }
    }

    if let Some(whitelist) = &conditions.ip_whitelist {
        let Some(ip_address) = ip_address else {
            // Whitelist required but no client IP supplied.
            return false;
        };
        let Ok(client_ip) = ip_address.parse::<IpAddr>() else {
            warn!(ip_address, "Invalid client IP address");
            return false;
        };

        let matched = whitelist.iter().any(|entry| {
            if let Ok(network) = entry.parse::<IpNet>() {
                return network.contains(&client_ip);
            }
            if let Ok(host) = entry.parse::<IpAddr>() {
                return host == client_ip;
            }
            warn!(entry = %entry, "Invalid IP whitelist entry");
            false
        });
        if !matched {
            return false;
        }
    }

    // max_actions_per_hour is reserved for future rate-limit counters
    // and currently always passes.

    true
}
