use crate::error::ParseError;
use latprobe_model::HostStat;

/// Token fping prints for a probe that got no reply.
pub const MISSING_REPLY: &str = "-";

/// Parses one line of `fping -C` output, e.g. `10.0.0.1 : 1.02 - 0.98`.
///
/// Every token counts toward `cnt`; missing-reply markers only count toward
/// loss. A line with no tokens yields `cnt == 0` and no loss.
pub fn parse_verbose(line: &str) -> Result<HostStat, ParseError> {
    let (host, pings) = split_host(line).ok_or_else(|| ParseError::MissingSeparator {
        line: line.trim_end().to_string(),
    })?;

    let host = host.trim();
    if host.is_empty() {
        return Err(ParseError::EmptyHost {
            line: line.trim_end().to_string(),
        });
    }

    let mut cnt = 0u32;
    let mut times = Vec::new();
    for token in pings.split_whitespace() {
        cnt += 1;
        if token == MISSING_REPLY {
            continue;
        }
        times.push(parse_latency(host, token)?);
    }

    Ok(HostStat::new(host, cnt, times))
}

fn split_host(line: &str) -> Option<(&str, &str)> {
    // fping pads its separator, which keeps IPv6 literals in one piece.
    if let Some((host, pings)) = line.split_once(" : ") {
        return Some((host, pings));
    }
    line.split_once(':')
}

fn parse_latency(host: &str, token: &str) -> Result<f64, ParseError> {
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ParseError::InvalidLatency {
            host: host.to_string(),
            token: token.to_string(),
        }),
    }
}
