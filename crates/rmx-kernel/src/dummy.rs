//! Seeded synthetic outcome counts for tests and benches.

use std::collections::BTreeSet;

use rmx_core::counts::OutcomeCounts;
use rmx_core::errors::{ErrorInfo, RmError};
use rmx_core::rng::RngHandle;

/// Largest number of distinct bitstrings a single request may produce.
pub const MAX_DISTINCT: usize = 1 << 31;

/// Widths up to this value are enumerated exhaustively, wider ones sampled.
const ENUMERATE_LIMIT: usize = 20;

fn dummy_error(code: &str, message: impl Into<String>) -> ErrorInfo {
    ErrorInfo::new(code, message.into())
}

fn format_bits(value: u64, bitlen: usize) -> String {
    format!("{value:0bitlen$b}")
}

/// Every bitstring of `bitlen` bits in ascending order.
pub fn make_all_bitstrings(bitlen: usize) -> Result<Vec<String>, RmError> {
    if bitlen > ENUMERATE_LIMIT {
        return Err(RmError::Config(
            dummy_error("dummy-too-wide", "exhaustive enumeration is limited to 20 bits")
                .with_context("bitlen", bitlen),
        ));
    }
    Ok((0..1u64 << bitlen).map(|v| format_bits(v, bitlen)).collect())
}

/// `num` distinct random bitstrings of width `bitlen`, sorted.
///
/// `None` asks for every bitstring of that width.
pub fn make_two_bit_str(bitlen: usize, num: Option<usize>, seed: u64) -> Result<Vec<String>, RmError> {
    pick_bitstrings(bitlen, num, &mut RngHandle::from_seed(seed))
}

fn pick_bitstrings(bitlen: usize, num: Option<usize>, rng: &mut RngHandle) -> Result<Vec<String>, RmError> {
    if bitlen == 0 {
        return Err(RmError::Config(dummy_error("dummy-zero-width", "bitstrings need at least one bit")));
    }
    let available = if bitlen < usize::BITS as usize - 1 {
        Some(1usize << bitlen)
    } else {
        None
    };
    let requested = match (num, available) {
        (Some(n), _) => n,
        (None, Some(all)) => all,
        (None, None) => MAX_DISTINCT + 1,
    };
    if requested > MAX_DISTINCT {
        return Err(RmError::Config(
            dummy_error("dummy-too-many", "too many distinct bitstrings requested")
                .with_context("requested", requested)
                .with_context("limit", MAX_DISTINCT),
        ));
    }
    if available.map_or(false, |all| requested > all) {
        return Err(RmError::Config(
            dummy_error("dummy-exceeds-space", "more bitstrings requested than exist at this width")
                .with_context("requested", requested)
                .with_context("bitlen", bitlen),
        ));
    }

    if bitlen <= ENUMERATE_LIMIT {
        let mut all: Vec<u64> = (0..1u64 << bitlen).collect();
        rng.shuffle(&mut all);
        all.truncate(requested);
        all.sort_unstable();
        return Ok(all.into_iter().map(|v| format_bits(v, bitlen)).collect());
    }

    let mut picked = BTreeSet::new();
    while picked.len() < requested {
        let mut bits = String::with_capacity(bitlen);
        let mut remaining = bitlen;
        while remaining > 0 {
            let chunk = remaining.min(64);
            bits.push_str(&format_bits(rng.next_bits(chunk as u32), chunk));
            remaining -= chunk;
        }
        picked.insert(bits);
    }
    Ok(picked.into_iter().collect())
}

/// Uniform counts over `bitstring_num` distinct `n_a`-bit strings.
pub fn make_dummy_case(
    n_a: usize,
    shot_per_case: u64,
    bitstring_num: Option<usize>,
    seed: u64,
) -> Result<OutcomeCounts, RmError> {
    let cases = make_two_bit_str(n_a, bitstring_num, seed)?;
    Ok(cases.into_iter().map(|case| (case, shot_per_case)).collect())
}

/// `cells` independent dummy cases; cell `i` draws from substream `i` of `master_seed`.
pub fn make_dummy_cells(
    n_a: usize,
    shot_per_case: u64,
    bitstring_num: Option<usize>,
    cells: usize,
    master_seed: u64,
) -> Result<Vec<OutcomeCounts>, RmError> {
    (0..cells as u64)
        .map(|cell| -> Result<OutcomeCounts, RmError> {
            let mut rng = RngHandle::substream(master_seed, cell);
            let cases = pick_bitstrings(n_a, bitstring_num, &mut rng)?;
            Ok(cases.into_iter().map(|case| (case, shot_per_case)).collect())
        })
        .collect()
}
