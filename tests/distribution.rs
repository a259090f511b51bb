//! Statistical behavior of the generated tuples: port-slot uniformity,
//! empty-list fallback, and instruction coverage.

use std::sync::Arc;

use iofuzz_rs::io_port;
use iofuzz_rs::ports::parse_port_spec;
use iofuzz_rs::{Fuzzer, Rng};

fn seeded_fuzzer(seed: u64, spec: Option<&str>) -> Fuzzer {
    let fuzzer = Fuzzer::new();
    if let Some(spec) = spec {
        fuzzer.set_ports(Some(Arc::new(parse_port_spec(spec).unwrap())));
    }
    fuzzer.set_rng(Arc::new(Rng::with_state(&seed.to_le_bytes())));
    fuzzer
}

#[test]
fn port_slot_is_uniform_over_the_list() {
    // 16 ports, 10k draws: expected 625 per bucket. The seed is fixed,
    // so this is a deterministic check, not a flaky one; the chi-square
    // bound is generous (p << 0.001 for 15 degrees of freedom).
    let fuzzer = seeded_fuzzer(0x5EED, Some("0x80-0x8f"));
    let trials = 10_000usize;
    let mut counts = [0u32; 16];

    for _ in 0..trials {
        let port = fuzzer.variates()[4];
        assert!((0x80..=0x8F).contains(&port), "port off-list: {port:#x}");
        counts[port - 0x80] += 1;
        fuzzer.randomize();
    }

    let expected = trials as f64 / 16.0;
    let chi_square: f64 = counts
        .iter()
        .map(|&c| {
            let d = c as f64 - expected;
            d * d / expected
        })
        .sum();
    assert!(chi_square < 60.0, "chi-square too high: {chi_square:.1}");
}

#[test]
fn duplicated_ports_weight_the_draw() {
    // 0x80 appears twice, 0x90 once: roughly two thirds of draws should
    // land on 0x80.
    let fuzzer = seeded_fuzzer(0xD1CE, Some("0x80,0x80,0x90"));
    let trials = 9_000usize;
    let mut hits_80 = 0usize;

    for _ in 0..trials {
        match fuzzer.variates()[4] {
            0x80 => hits_80 += 1,
            0x90 => {}
            other => panic!("port off-list: {other:#x}"),
        }
        fuzzer.randomize();
    }

    let ratio = hits_80 as f64 / trials as f64;
    assert!(
        (0.6..0.75).contains(&ratio),
        "expected ~2/3 on the duplicated port, got {ratio:.3}"
    );
}

#[test]
fn no_port_list_falls_back_to_full_space() {
    let fuzzer = seeded_fuzzer(0xF0F0, None);
    let trials = 10_000usize;
    let mut min = usize::MAX;
    let mut max = 0usize;

    for _ in 0..trials {
        let port = fuzzer.variates()[4];
        assert!(port <= 0xFFFF);
        min = min.min(port);
        max = max.max(port);
        fuzzer.randomize();
    }

    // Uniform draws over 64k values should reach both ends quickly.
    assert!(min < 0x0400, "min never got low: {min:#x}");
    assert!(max > 0xFC00, "max never got high: {max:#x}");
}

#[test]
fn all_twelve_mnemonics_appear() {
    let fuzzer = seeded_fuzzer(0xC0FFEE, Some("0x80"));
    let mut seen = [false; io_port::NUM_INSTRUCTIONS];

    for _ in 0..240 {
        seen[fuzzer.variates()[0]] = true;
        fuzzer.randomize();
    }

    for (selector, &hit) in seen.iter().enumerate() {
        assert!(hit, "{} never selected", io_port::mnemonic(selector));
    }
}

#[test]
fn rep_count_spans_its_range() {
    let fuzzer = seeded_fuzzer(0xBEEF, None);
    let mut min = usize::MAX;
    let mut max = 0usize;

    for _ in 0..5_000 {
        let count = fuzzer.variates()[3];
        assert!((1..=64).contains(&count));
        min = min.min(count);
        max = max.max(count);
        fuzzer.randomize();
    }
    assert_eq!(min, 1);
    assert_eq!(max, 64);
}

#[test]
fn successive_snapshots_never_repeat() {
    let fuzzer = seeded_fuzzer(0xABAD_1DEA, None);
    let mut previous = fuzzer.state();
    for _ in 0..1_000 {
        fuzzer.randomize();
        let current = fuzzer.state();
        assert_ne!(previous, current, "snapshot repeated");
        previous = current;
    }
}
