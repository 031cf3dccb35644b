// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use imx23_config::{parse_size, ChipDescriptor};
use std::path::PathBuf;

#[test]
fn test_minimal_chip_parses() {
    let yaml = r#"
name: "imx23"
peripherals:
  - id: "icoll"
    type: "icoll"
    base_address: 0x80000000
"#;
    let desc = ChipDescriptor::from_yaml(yaml).unwrap();
    assert_eq!(desc.schema_version, "1.0");
    assert_eq!(desc.peripherals.len(), 1);
    assert_eq!(desc.peripherals[0].r#type, "icoll");
    assert_eq!(desc.peripherals[0].size, None);
    assert_eq!(desc.peripherals[0].irq, None);
}

#[test]
fn test_wired_peripheral_fields() {
    let yaml = r#"
name: "imx23"
peripherals:
  - id: "auart0"
    type: "auart"
    base_address: 0x8006c000
    size: "8 KiB"
    irq: 112
"#;
    let desc = ChipDescriptor::from_yaml(yaml).unwrap();
    let uart = desc.peripheral("auart0").unwrap();
    assert_eq!(uart.base_address, 0x8006_C000);
    assert_eq!(uart.irq, Some(112));
    assert_eq!(parse_size(uart.size.as_deref().unwrap()).unwrap(), 0x2000);
}

#[test]
fn test_irq_beyond_collector_rejected() {
    let yaml = r#"
name: "imx23"
peripherals:
  - id: "auart0"
    type: "auart"
    base_address: 0x8006c000
    irq: 200
"#;
    let err = ChipDescriptor::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("collector line 200"));
}

#[test]
fn test_shipped_chip_descriptor() {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let path = root.join("../../configs/chips/imx23.yaml");
    let desc = ChipDescriptor::from_file(path).unwrap();
    assert_eq!(desc.name, "imx23");
    assert!(desc.peripheral("icoll").is_some());
    assert_eq!(desc.peripheral("auart1").and_then(|p| p.irq), Some(115));
}

#[test]
fn test_duplicate_id_rejected() {
    let yaml = r#"
name: "imx23"
peripherals:
  - id: "auart0"
    type: "auart"
    base_address: 0x8006c000
  - id: "auart0"
    type: "auart"
    base_address: 0x8006e000
"#;
    let err = ChipDescriptor::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("Duplicate peripheral id 'auart0'"));
}

#[test]
fn test_window_past_address_space_rejected() {
    let yaml = r#"
name: "imx23"
peripherals:
  - id: "icoll"
    type: "icoll"
    base_address: 0xfffffffffffff000
    size: "8 KiB"
"#;
    let err = ChipDescriptor::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("end of the address space"));
}
