//! Structural Verilog for the final netlist.
//!
//! Every bit is referred to by name: a port or net name when one covers
//! it (indexed for multi-bit names), `net_<bit>` otherwise. Multi-bit
//! connections become `{MSB, ..., LSB}` concatenations. Names that are not
//! plain identifiers are written as escaped identifiers.

use sasic_common::NetBit;
use sasic_db::{Bit, Netlist, Port};
use std::collections::{BTreeMap, BTreeSet};

/// Renders `netlist` as one structural Verilog module.
pub fn write_verilog(netlist: &Netlist) -> String {
    let mut writer = VerilogWriter::new(netlist);
    writer.emit_module();
    writer.output
}

/// Returns `name` as a legal Verilog identifier, escaping it if needed.
pub fn escape_identifier(name: &str) -> String {
    let mut chars = name.chars();
    let plain = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    };
    if plain {
        name.to_string()
    } else {
        format!("\\{name} ")
    }
}

struct VerilogWriter<'a> {
    netlist: &'a Netlist,
    names: BTreeMap<NetBit, String>,
    anonymous: BTreeSet<NetBit>,
    output: String,
    indent: usize,
}

impl<'a> VerilogWriter<'a> {
    fn new(netlist: &'a Netlist) -> Self {
        let mut names = BTreeMap::new();
        // Port names first, then visible net names, then hidden ones.
        for port in netlist.ports() {
            bind_names(&mut names, &port.name, &port.bits);
        }
        for hidden in [false, true] {
            for (name, net) in netlist.net_names() {
                if net.hide_name == hidden {
                    bind_names(&mut names, name, &net.bits);
                }
            }
        }
        let anonymous = netlist
            .all_net_bits()
            .into_iter()
            .filter(|b| !names.contains_key(b))
            .collect();
        Self {
            netlist,
            names,
            anonymous,
            output: String::new(),
            indent: 0,
        }
    }

    fn emit(&mut self, s: &str) {
        self.output.push_str(&"  ".repeat(self.indent));
        self.output.push_str(s);
    }

    fn emit_line(&mut self, s: &str) {
        self.emit(s);
        self.output.push('\n');
    }

    fn bit_ref(&self, bit: Bit) -> String {
        match bit {
            Bit::Const(c) => format!("1'b{}", c.as_char()),
            Bit::Net(n) => match self.names.get(&n) {
                Some(name) => name.clone(),
                None => format!("net_{n}"),
            },
        }
    }

    fn bits_ref(&self, bits: &[Bit]) -> String {
        match bits {
            [] => String::new(),
            [bit] => self.bit_ref(*bit),
            _ => {
                let parts: Vec<String> = bits.iter().rev().map(|b| self.bit_ref(*b)).collect();
                format!("{{{}}}", parts.join(", "))
            }
        }
    }

    fn emit_module(&mut self) {
        let netlist = self.netlist;
        let header: Vec<String> = netlist
            .ports()
            .iter()
            .map(|p| escape_identifier(&p.name))
            .collect();
        self.emit_line(&format!(
            "module {}({});",
            escape_identifier(&netlist.module_name),
            header.join(", ")
        ));
        self.indent += 1;

        for port in netlist.ports() {
            let decl = format!("{}{}", port.direction.as_str(), range(port.bits.len()));
            self.emit_line(&format!("{decl} {};", escape_identifier(&port.name)));
        }

        let port_names: BTreeSet<&str> = netlist.ports().iter().map(|p| p.name.as_str()).collect();
        for (name, net) in netlist.net_names() {
            if port_names.contains(name.as_str()) {
                continue;
            }
            self.emit_line(&format!("wire{} {};", range(net.bits.len()), escape_identifier(name)));
        }
        for bit in self.anonymous.clone() {
            self.emit_line(&format!("wire net_{bit};"));
        }

        for port in netlist.ports() {
            self.emit_port_assigns(port);
        }

        for cell in netlist.cells() {
            let conns: Vec<String> = cell
                .connections
                .iter()
                .map(|(port, bits)| format!(".{}({})", escape_identifier(port), self.bits_ref(bits)))
                .collect();
            self.emit_line(&format!(
                "{} {} ({});",
                escape_identifier(&cell.cell_type),
                escape_identifier(&cell.name),
                conns.join(", ")
            ));
        }

        self.indent -= 1;
        self.emit_line("endmodule");
    }

    /// Port bits that are constant or named after something else need an
    /// explicit assignment.
    fn emit_port_assigns(&mut self, port: &Port) {
        let own = escape_identifier(&port.name);
        let wide = port.bits.len() > 1;
        for (i, bit) in port.bits.iter().enumerate() {
            let target = if wide {
                format!("{own}[{i}]")
            } else {
                own.clone()
            };
            let source = self.bit_ref(*bit);
            if source != target {
                self.emit_line(&format!("assign {target} = {source};"));
            }
        }
    }
}

/// Claims every unnamed bit of `bits` for `name`.
fn bind_names(names: &mut BTreeMap<NetBit, String>, name: &str, bits: &[Bit]) {
    let escaped = escape_identifier(name);
    let wide = bits.len() > 1;
    for (i, bit) in bits.iter().enumerate() {
        if let Bit::Net(n) = bit {
            names.entry(*n).or_insert_with(|| {
                if wide {
                    format!("{escaped}[{i}]")
                } else {
                    escaped.clone()
                }
            });
        }
    }
}

fn range(width: usize) -> String {
    if width > 1 {
        format!(" [{}:0]", width - 1)
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sasic_db::{ConstBit, LogicalCell, NetName, PortDirection};

    fn net(n: u32) -> Bit {
        Bit::Net(NetBit::from_raw(n))
    }

    fn sample() -> Netlist {
        let mut nl = Netlist::new("top");
        nl.add_port(Port {
            name: "a".into(),
            direction: PortDirection::Input,
            bits: vec![net(2), net(3)],
        })
        .unwrap();
        nl.add_port(Port {
            name: "y".into(),
            direction: PortDirection::Output,
            bits: vec![net(4)],
        })
        .unwrap();
        nl.add_net_name("mid", NetName::single(NetBit::from_raw(5))).unwrap();
        nl.add_cell(
            LogicalCell::new("u_and", "sky130_fd_sc_hd__and2_1")
                .with_port("A", PortDirection::Input, vec![net(2)])
                .with_port("B", PortDirection::Input, vec![net(3)])
                .with_port("X", PortDirection::Output, vec![net(5)]),
        )
        .unwrap();
        nl.add_cell(
            LogicalCell::new("$abc$12$u", "sky130_fd_sc_hd__buf_1")
                .with_port("A", PortDirection::Input, vec![net(5)])
                .with_port("X", PortDirection::Output, vec![net(4)]),
        )
        .unwrap();
        nl
    }

    #[test]
    fn module_structure() {
        let v = write_verilog(&sample());
        assert!(v.starts_with("module top(a, y);\n"));
        assert!(v.contains("  input [1:0] a;\n"));
        assert!(v.contains("  output y;\n"));
        assert!(v.contains("  wire mid;\n"));
        assert!(v.contains("  sky130_fd_sc_hd__and2_1 u_and (.A(a[0]), .B(a[1]), .X(mid));\n"));
        assert!(v.trim_end().ends_with("endmodule"));
        assert!(!v.contains("assign"));
    }

    #[test]
    fn escapes_yosys_names() {
        let v = write_verilog(&sample());
        assert!(v.contains("sky130_fd_sc_hd__buf_1 \\$abc$12$u  (.A(mid), .X(y));"));
        assert_eq!(escape_identifier("u_1$x"), "u_1$x");
        assert_eq!(escape_identifier("1bad"), "\\1bad ");
        assert_eq!(escape_identifier("a.b"), "\\a.b ");
    }

    #[test]
    fn concatenation_is_msb_first() {
        let mut nl = sample();
        nl.add_cell(
            LogicalCell::new("u_bus", "blackbox")
                .with_port("D", PortDirection::Input, vec![net(2), Bit::Const(ConstBit::One), net(9)]),
        )
        .unwrap();
        let v = write_verilog(&nl);
        assert!(v.contains(".D({net_9, 1'b1, a[0]})"), "{v}");
        assert!(v.contains("  wire net_9;\n"));
    }

    #[test]
    fn constant_and_aliased_outputs_are_assigned() {
        let mut nl = Netlist::new("top");
        nl.add_port(Port {
            name: "a".into(),
            direction: PortDirection::Input,
            bits: vec![net(2)],
        })
        .unwrap();
        nl.add_port(Port {
            name: "y".into(),
            direction: PortDirection::Output,
            bits: vec![net(2), Bit::Const(ConstBit::Zero)],
        })
        .unwrap();
        let v = write_verilog(&nl);
        assert!(v.contains("  assign y[0] = a;\n"), "{v}");
        assert!(v.contains("  assign y[1] = 1'b0;\n"));
    }

    #[test]
    fn hidden_names_lose_to_visible_ones() {
        let mut nl = Netlist::new("top");
        let mut hidden = NetName::single(NetBit::from_raw(7));
        hidden.hide_name = true;
        nl.add_net_name("$auto$7", hidden).unwrap();
        nl.add_net_name("zz_visible", NetName::single(NetBit::from_raw(7))).unwrap();
        nl.add_cell(LogicalCell::new("u", "t").with_port("A", PortDirection::Input, vec![net(7)]))
            .unwrap();
        let v = write_verilog(&nl);
        assert!(v.contains("t u (.A(zz_visible));"), "{v}");
    }
}
