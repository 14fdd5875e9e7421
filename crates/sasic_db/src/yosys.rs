//! Synthesized JSON netlists (the `yosys write_json` shape).
//!
//! Only one module is kept: the requested top, else the module carrying a
//! truthy `top` attribute, else the sole module.

use crate::load::LoadError;
use crate::netlist::{Bit, LogicalCell, NetName, Netlist, Port, PortDirection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const TOP_TRUE: &str = "00000000000000000000000000000001";

#[derive(Debug, Serialize, Deserialize)]
struct RawDesign {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    creator: Option<String>,
    modules: BTreeMap<String, RawModule>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawModule {
    #[serde(default)]
    attributes: BTreeMap<String, Value>,
    #[serde(default)]
    ports: BTreeMap<String, RawPort>,
    #[serde(default)]
    cells: BTreeMap<String, RawCell>,
    #[serde(default)]
    netnames: BTreeMap<String, RawNetName>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawPort {
    direction: PortDirection,
    bits: Vec<Bit>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawCell {
    #[serde(default)]
    hide_name: u8,
    #[serde(rename = "type")]
    cell_type: String,
    #[serde(default)]
    parameters: BTreeMap<String, Value>,
    #[serde(default)]
    attributes: BTreeMap<String, Value>,
    #[serde(default)]
    port_directions: BTreeMap<String, PortDirection>,
    #[serde(default)]
    connections: BTreeMap<String, Vec<Bit>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawNetName {
    #[serde(default)]
    hide_name: u8,
    bits: Vec<Bit>,
    #[serde(default)]
    attributes: BTreeMap<String, Value>,
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_u64().is_some_and(|n| n != 0),
        Value::String(s) => s.chars().any(|c| c == '1'),
        _ => false,
    }
}

fn pick_top<'a>(
    modules: &'a BTreeMap<String, RawModule>,
    top: Option<&str>,
) -> Result<(&'a String, &'a RawModule), LoadError> {
    if let Some(name) = top {
        return modules
            .get_key_value(name)
            .ok_or_else(|| LoadError::Invalid(format!("top module '{name}' not found")));
    }
    let flagged: Vec<_> = modules
        .iter()
        .filter(|(_, m)| m.attributes.get("top").is_some_and(is_truthy))
        .collect();
    match (flagged.as_slice(), modules.len()) {
        ([only], _) => Ok(*only),
        ([], 1) => modules
            .iter()
            .next()
            .ok_or_else(|| LoadError::Invalid("netlist has no modules".into())),
        ([], 0) => Err(LoadError::Invalid("netlist has no modules".into())),
        _ => Err(LoadError::Invalid(
            "cannot pick a top module; set design.top".into(),
        )),
    }
}

/// Parses a JSON netlist. `origin` names the source in error messages.
pub fn parse_netlist(text: &str, top: Option<&str>, origin: &str) -> Result<Netlist, LoadError> {
    let raw: RawDesign = serde_json::from_str(text).map_err(|source| LoadError::Json {
        origin: origin.to_string(),
        source,
    })?;
    let (name, module) = pick_top(&raw.modules, top)?;
    let mut netlist = Netlist::new(name.clone());
    netlist.attributes = module.attributes.clone();
    for (port_name, port) in &module.ports {
        netlist.add_port(Port {
            name: port_name.clone(),
            direction: port.direction,
            bits: port.bits.clone(),
        })?;
    }
    for (cell_name, raw_cell) in &module.cells {
        let mut cell = LogicalCell::new(cell_name.clone(), raw_cell.cell_type.clone());
        cell.connections = raw_cell.connections.clone();
        cell.port_directions = raw_cell.port_directions.clone();
        cell.attributes = raw_cell.attributes.clone();
        cell.parameters = raw_cell.parameters.clone();
        netlist.add_cell(cell)?;
    }
    for (net_name, raw_net) in &module.netnames {
        netlist.add_net_name(
            net_name.clone(),
            NetName {
                bits: raw_net.bits.clone(),
                hide_name: raw_net.hide_name != 0,
                attributes: raw_net.attributes.clone(),
            },
        )?;
    }
    Ok(netlist)
}

/// Serializes a netlist back into the JSON shape it was read from.
pub fn write_netlist(netlist: &Netlist) -> Result<String, serde_json::Error> {
    let mut module = RawModule {
        attributes: netlist.attributes.clone(),
        ..RawModule::default()
    };
    module
        .attributes
        .entry("top".to_string())
        .or_insert_with(|| Value::String(TOP_TRUE.to_string()));
    for port in netlist.ports() {
        module.ports.insert(
            port.name.clone(),
            RawPort {
                direction: port.direction,
                bits: port.bits.clone(),
            },
        );
    }
    for cell in netlist.cells() {
        module.cells.insert(
            cell.name.clone(),
            RawCell {
                hide_name: u8::from(cell.name.starts_with('$')),
                cell_type: cell.cell_type.clone(),
                parameters: cell.parameters.clone(),
                attributes: cell.attributes.clone(),
                port_directions: cell.port_directions.clone(),
                connections: cell.connections.clone(),
            },
        );
    }
    for (name, net) in netlist.net_names() {
        module.netnames.insert(
            name.clone(),
            RawNetName {
                hide_name: u8::from(net.hide_name),
                bits: net.bits.clone(),
                attributes: net.attributes.clone(),
            },
        );
    }
    let mut modules = BTreeMap::new();
    modules.insert(netlist.module_name.clone(), module);
    let design = RawDesign {
        creator: Some(format!("sasic {}", env!("CARGO_PKG_VERSION"))),
        modules,
    };
    serde_json::to_string_pretty(&design)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::ConstBit;
    use sasic_common::NetBit;

    const SAMPLE: &str = r#"{
      "creator": "Yosys",
      "modules": {
        "helper": { "attributes": {}, "ports": {}, "cells": {}, "netnames": {} },
        "counter": {
          "attributes": { "top": "00000000000000000000000000000001" },
          "ports": {
            "clk": { "direction": "input", "bits": [2] },
            "q": { "direction": "output", "bits": [3, 4] }
          },
          "cells": {
            "$abc$1": {
              "hide_name": 1,
              "type": "sky130_fd_sc_hd__dfxtp_1",
              "parameters": {},
              "attributes": { "src": "counter.v:5" },
              "port_directions": { "CLK": "input", "D": "input", "Q": "output" },
              "connections": { "CLK": [2], "D": ["1"], "Q": [3] }
            }
          },
          "netnames": {
            "clk": { "hide_name": 0, "bits": [2], "attributes": {} },
            "q": { "hide_name": 0, "bits": [3, 4], "attributes": {} }
          }
        }
      }
    }"#;

    #[test]
    fn top_attribute_selects_module() {
        let nl = parse_netlist(SAMPLE, None, "sample").unwrap();
        assert_eq!(nl.module_name, "counter");
        assert_eq!(nl.ports().len(), 2);
        assert_eq!(nl.cell_count(), 1);
    }

    #[test]
    fn explicit_top_wins() {
        let nl = parse_netlist(SAMPLE, Some("helper"), "sample").unwrap();
        assert_eq!(nl.module_name, "helper");
        assert!(parse_netlist(SAMPLE, Some("absent"), "sample").is_err());
    }

    #[test]
    fn constants_preserved() {
        let nl = parse_netlist(SAMPLE, None, "sample").unwrap();
        let cell = nl.cell_by_name("$abc$1").unwrap();
        assert_eq!(cell.connections["D"], vec![Bit::Const(ConstBit::One)]);
        assert_eq!(cell.direction("Q"), Some(PortDirection::Output));
    }

    #[test]
    fn written_json_reads_back() {
        let mut nl = parse_netlist(SAMPLE, None, "sample").unwrap();
        let fresh = nl.alloc_net("extra").unwrap();
        let text = write_netlist(&nl).unwrap();
        let again = parse_netlist(&text, None, "written").unwrap();
        assert_eq!(again.module_name, "counter");
        assert_eq!(again.net_by_name("extra"), Some(fresh));
        assert_eq!(again.cells(), nl.cells());
        assert_eq!(fresh, NetBit::from_raw(5));
    }

    #[test]
    fn ambiguous_top_rejected() {
        let text = r#"{"modules": {"a": {}, "b": {}}}"#;
        assert!(matches!(
            parse_netlist(text, None, "t"),
            Err(LoadError::Invalid(_))
        ));
    }

    #[test]
    fn malformed_json_reports_origin() {
        let err = parse_netlist("{", None, "broken.json").unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
