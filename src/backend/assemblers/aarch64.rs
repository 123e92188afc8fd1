//! Text builder for GNU-syntax AArch64 assembly.

#[derive(Debug, Default)]
pub struct Assembler {
    output: String,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_output(self) -> String {
        self.output
    }

    fn push_line(&mut self, string: impl AsRef<str>) {
        self.output.push_str(string.as_ref());
        self.output.push('\n');
    }

    pub fn emit(&mut self, string: impl AsRef<str>) {
        self.output.push_str("    ");
        self.push_line(string);
    }

    /// Section markers and other top-level directives, unindented
    pub fn directive(&mut self, string: impl AsRef<str>) {
        self.push_line(string);
    }

    pub fn label(&mut self, name: impl AsRef<str>) {
        self.push_line(format!("{}:", name.as_ref()));
    }

    pub fn comment(&mut self, comment: impl AsRef<str>) {
        self.emit(format!("// {}", comment.as_ref()));
    }

    pub fn blank_line(&mut self) {
        self.output.push('\n');
    }

    /// Materializes an arbitrary 64-bit immediate with a movz/movk sequence.
    /// `mov` alone only covers 16-bit immediates.
    pub fn load_immediate(&mut self, register: XRegister, value: u64) {
        self.emit(format!("movz {register}, #{}", value & 0xffff));

        for shift in [16u32, 32, 48] {
            let chunk = (value >> shift) & 0xffff;

            if chunk != 0 {
                self.emit(format!("movk {register}, #{chunk}, lsl #{shift}"));
            }
        }
    }

    /// PC-relative address of a label into a register
    pub fn load_label_address(&mut self, register: XRegister, label: impl AsRef<str>) {
        let label = label.as_ref();

        self.emit(format!("adrp {register}, {label}"));
        self.emit(format!("add {register}, {register}, :lo12:{label}"));
    }
}

/// General purpose register, 64-bit view
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[rustfmt::skip]
pub enum XRegister {
    X0, X1, X2, X3, X4, X5, X6, X7,
    X8, X9, X10, X11, X12, X13, X14, X15,
    X16, X17, X18, X19, X20, X21, X22, X23,
    X24, X25, X26, X27, X28, X29, X30,
    Sp, Xzr,
}

impl XRegister {
    /// The 32-bit view of the same register (used for byte loads/stores)
    pub fn as_32_bit(self) -> WRegister {
        match self {
            Self::X0 => WRegister::W0,
            Self::X1 => WRegister::W1,
            Self::X2 => WRegister::W2,
            Self::X3 => WRegister::W3,
            Self::X4 => WRegister::W4,
            Self::X5 => WRegister::W5,
            Self::X6 => WRegister::W6,
            Self::X7 => WRegister::W7,
            Self::X8 => WRegister::W8,
            Self::X9 => WRegister::W9,
            Self::X10 => WRegister::W10,
            Self::X11 => WRegister::W11,
            Self::X12 => WRegister::W12,
            Self::X13 => WRegister::W13,
            Self::X14 => WRegister::W14,
            Self::X15 => WRegister::W15,
            Self::X16 => WRegister::W16,
            Self::X17 => WRegister::W17,
            Self::X18 => WRegister::W18,
            Self::X19 => WRegister::W19,
            Self::X20 => WRegister::W20,
            Self::X21 => WRegister::W21,
            Self::X22 => WRegister::W22,
            Self::X23 => WRegister::W23,
            Self::X24 => WRegister::W24,
            Self::X25 => WRegister::W25,
            Self::X26 => WRegister::W26,
            Self::X27 => WRegister::W27,
            Self::X28 => WRegister::W28,
            Self::X29 => WRegister::W29,
            Self::X30 => WRegister::W30,
            Self::Sp => WRegister::Wsp,
            Self::Xzr => WRegister::Wzr,
        }
    }
}

/// General purpose register, 32-bit view
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[rustfmt::skip]
pub enum WRegister {
    W0, W1, W2, W3, W4, W5, W6, W7,
    W8, W9, W10, W11, W12, W13, W14, W15,
    W16, W17, W18, W19, W20, W21, W22, W23,
    W24, W25, W26, W27, W28, W29, W30,
    Wsp, Wzr,
}

/// Renders text as the body of a `.string` directive (quotes included).
/// The lexer lets raw newlines through inside literals, so control characters
/// must be escaped for the assembler.
pub fn format_gas_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');

    for b in text.bytes() {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\{b:03o}")),
        }
    }

    out.push('"');
    out
}
