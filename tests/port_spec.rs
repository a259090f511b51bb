//! Port-spec parsing laws: round trips, clamping, and rejection.

use iofuzz_rs::ports::{parse_port_spec, parse_uint, PortSpecError, MAX_PORT};

#[test]
fn mixed_spec_round_trip() {
    let ports = parse_port_spec("0x70,0x80-0x82,0x90").unwrap();
    assert_eq!(ports.as_slice(), &[0x70, 0x80, 0x81, 0x82, 0x90]);
}

#[test]
fn high_range_clamps_into_port_space() {
    let ports = parse_port_spec("0xFFFE-0x1FFFF").unwrap();
    assert_eq!(ports.as_slice(), &[0xFFFE, 0xFFFF]);
}

#[test]
fn full_space_expansion_has_every_port() {
    let ports = parse_port_spec("0-0x20000").unwrap();
    assert_eq!(ports.len(), 0x10000);
    for (i, &port) in ports.iter().enumerate() {
        assert_eq!(port as usize, i);
    }
}

#[test]
fn decimal_octal_hex_mix() {
    let ports = parse_port_spec("16,0x10,020").unwrap();
    assert_eq!(ports.as_slice(), &[16, 16, 16]);
}

#[test]
fn empty_spec_is_empty_list() {
    assert!(parse_port_spec("").unwrap().is_empty());
}

#[test]
fn garbage_is_rejected_not_zeroed() {
    for bad in ["lpt1", "0x80,midi", "1-2-3", "0x90-0x80"] {
        assert!(
            parse_port_spec(bad).is_err(),
            "expected rejection for {bad:?}"
        );
    }
    assert!(matches!(
        parse_port_spec("com1"),
        Err(PortSpecError::BadToken(_))
    ));
}

#[test]
fn parse_uint_strtoul_bases() {
    assert_eq!(parse_uint("0x1FFFF"), Some(0x1FFFF));
    assert_eq!(parse_uint("0777"), Some(0o777));
    assert_eq!(parse_uint("65535"), Some(65535));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The parser never panics, whatever the input.
        #[test]
        fn parser_is_total(spec in ".{0,64}") {
            let _ = parse_port_spec(&spec);
        }

        /// Everything a successful parse yields is a legal port.
        #[test]
        fn parsed_ports_stay_in_space(spec in "[0-9xX,-]{0,32}") {
            if let Ok(ports) = parse_port_spec(&spec) {
                for &port in ports.iter() {
                    prop_assert!(port <= MAX_PORT);
                }
            }
        }

        /// A single in-range value parses to itself.
        #[test]
        fn singleton_round_trip(port in 0u64..=0xFFFF) {
            let ports = parse_port_spec(&format!("{port}")).unwrap();
            prop_assert_eq!(ports.as_slice(), &[port as u16]);

            let ports = parse_port_spec(&format!("{port:#x}")).unwrap();
            prop_assert_eq!(ports.as_slice(), &[port as u16]);
        }

        /// An ascending range expands to exactly `hi - lo + 1` entries.
        #[test]
        fn range_expansion_size(lo in 0u64..=0xFFFF, span in 0u64..=256) {
            let hi = (lo + span).min(0xFFFF);
            let ports = parse_port_spec(&format!("{lo}-{hi}")).unwrap();
            prop_assert_eq!(ports.len() as u64, hi - lo + 1);
            prop_assert_eq!(ports[0], lo as u16);
            prop_assert_eq!(ports[ports.len() - 1], hi as u16);
        }
    }
}
