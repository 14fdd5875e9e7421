//! Port-to-pin assignment.
//!
//! Pins are walked in a fixed physical order (side W, S, E, N, then along
//! and across the side, then track) so the binding is deterministic and
//! neighboring bus bits land on neighboring pins. Clock and reset ports
//! are bound first, preferring a pin with the identical name.

use sasic_common::PinId;
use sasic_db::{Bit, Netlist, Pin, PinBinding, PinTable, PortDirection};
use sasic_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use std::collections::{BTreeMap, HashMap};

/// A port bit left without a pin.
pub const PORT_WITHOUT_PIN: DiagnosticCode = DiagnosticCode::new(Category::Placement, 104);

const CLOCK_NAMES: &[&str] = &["clk", "clock"];
const RESET_NAMES: &[&str] = &["rst", "rst_n", "reset", "reset_n"];

/// One bound port bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortAssignment {
    /// Pin the bit was bound to.
    pub pin: PinId,
    /// Port name.
    pub port: String,
    /// Bit index within the port.
    pub bit: usize,
    /// The netlist bit.
    pub net: Bit,
}

/// Splits `data[7]` or `data_7` into `("data", Some(7))`.
pub fn parse_bus(name: &str) -> (&str, Option<u32>) {
    let name = name.trim();
    if let Some(open) = name.strip_suffix(']').and_then(|s| s.rfind('[')) {
        let base = &name[..open];
        if let Ok(bit) = name[open + 1..name.len() - 1].parse() {
            if !base.is_empty() {
                return (base, Some(bit));
            }
        }
    }
    if let Some((base, digits)) = name.rsplit_once('_') {
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(bit) = digits.parse() {
                return (base, Some(bit));
            }
        }
    }
    (name, None)
}

#[derive(Debug, Clone)]
struct PortBit<'n> {
    port: &'n str,
    bit: usize,
    net: Bit,
    direction: PortDirection,
    base: &'n str,
    order: Option<u32>,
}

fn port_bits(netlist: &Netlist) -> Vec<PortBit<'_>> {
    let mut out = Vec::new();
    for port in netlist.ports() {
        let direction = if port.name.eq_ignore_ascii_case("oeb") {
            PortDirection::Input
        } else {
            port.direction
        };
        let multi = port.bits.len() > 1;
        for (i, net) in port.bits.iter().enumerate() {
            let (base, order) = if multi {
                (port.name.as_str(), Some(i as u32))
            } else {
                parse_bus(&port.name)
            };
            out.push(PortBit {
                port: &port.name,
                bit: i,
                net: *net,
                direction,
                base,
                order,
            });
        }
    }
    out
}

fn matches_any(name: &str, names: &[&str]) -> bool {
    names.iter().any(|n| name.eq_ignore_ascii_case(n))
}

/// Binds every top-level port bit of `netlist` to a pin of matching direction.
///
/// Existing bindings are cleared first. Bits that find no free pin are left
/// unbound and reported once per port with `P104`.
pub fn assign_ports(netlist: &Netlist, pins: &mut PinTable, sink: &DiagnosticSink) -> Vec<PortAssignment> {
    pins.clear_bindings();
    let mut ordered: Vec<&Pin> = pins.pins().iter().collect();
    ordered.sort_by_key(|p| (p.physical_key(), p.id));
    let mut taken = vec![false; pins.len()];
    let mut assignments: Vec<PortAssignment> = Vec::new();
    let bits = port_bits(netlist);
    let mut bound = vec![false; bits.len()];

    for names in [CLOCK_NAMES, RESET_NAMES] {
        for (i, pb) in bits.iter().enumerate() {
            if !matches_any(pb.port, names) {
                continue;
            }
            let pick = ordered
                .iter()
                .filter(|p| {
                    !taken[p.id.index()]
                        && p.direction == PortDirection::Input
                        && matches_any(&p.name, names)
                })
                .min_by_key(|p| !p.name.eq_ignore_ascii_case(pb.port));
            if let Some(pin) = pick {
                taken[pin.id.index()] = true;
                bound[i] = true;
                assignments.push(PortAssignment {
                    pin: pin.id,
                    port: pb.port.to_string(),
                    bit: pb.bit,
                    net: pb.net,
                });
            }
        }
    }

    let mut groups: BTreeMap<(PortDirection, &str), Vec<usize>> = BTreeMap::new();
    for (i, pb) in bits.iter().enumerate() {
        if !bound[i] {
            groups.entry((pb.direction, pb.base)).or_default().push(i);
        }
    }
    for ((direction, base), mut members) in groups {
        members.sort_by_key(|i| (bits[*i].order.is_none(), bits[*i].order));
        for i in members {
            let same_base = ordered.iter().find(|p| {
                !taken[p.id.index()] && p.direction == direction && parse_bus(&p.name).0 == base
            });
            let pick = same_base.or_else(|| {
                ordered
                    .iter()
                    .find(|p| !taken[p.id.index()] && p.direction == direction)
            });
            let Some(pin) = pick else {
                continue;
            };
            taken[pin.id.index()] = true;
            bound[i] = true;
            let pb = &bits[i];
            assignments.push(PortAssignment {
                pin: pin.id,
                port: pb.port.to_string(),
                bit: pb.bit,
                net: pb.net,
            });
        }
    }

    let mut missing: HashMap<&str, usize> = HashMap::new();
    for (i, pb) in bits.iter().enumerate() {
        if !bound[i] {
            *missing.entry(pb.port).or_insert(0) += 1;
        }
    }
    for port in netlist.ports() {
        if let Some(count) = missing.get(port.name.as_str()) {
            sink.emit(
                Diagnostic::warning(
                    PORT_WITHOUT_PIN,
                    format!("{count} bit(s) of port '{}' have no {} pin", port.name, port.direction),
                )
                .with_subject(port.name.clone()),
            );
        }
    }

    for a in &assignments {
        pins.bind(
            a.pin,
            PinBinding {
                port: a.port.clone(),
                bit: a.bit,
                net: a.net,
            },
        );
    }
    assignments
}
