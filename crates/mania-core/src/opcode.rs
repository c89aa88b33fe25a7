/// One-byte opcode tags. Values are taken verbatim from the reference
/// implementation's `mania/consts.py` rather than assigned fresh, so a
/// `.bam` file produced by that implementation decodes correctly here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0x00,

    Duplicate = 0x10,
    Rotate = 0x11,
    Pop = 0x12,
    Store = 0x13,
    Load = 0x14,
    LoadField = 0x15,
    LoadConstant = 0x16,
    LoadCode = 0x17,
    LoadModule = 0x18,

    Negate = 0x20,
    Add = 0x21,
    Sub = 0x22,
    Mul = 0x23,
    Div = 0x24,
    Pow = 0x25,
    Mod = 0x26,
    Rem = 0x27,
    Round = 0x28,
    Floor = 0x29,
    Ceil = 0x2a,

    BitNot = 0x30,
    BitAnd = 0x31,
    BitOr = 0x32,
    BitXor = 0x33,
    BitShiftLeft = 0x34,
    BitShiftRight = 0x35,

    LogicNot = 0x40,
    LogicAnd = 0x41,
    LogicOr = 0x42,
    LogicXor = 0x43,
    Type = 0x44,
    Equal = 0x45,
    NotEqual = 0x46,
    Greater = 0x47,
    GreaterEqual = 0x48,
    Less = 0x49,
    LessEqual = 0x4a,

    Jump = 0x50,
    JumpIfNil = 0x51,
    JumpIfTrue = 0x52,
    JumpIfFalse = 0x53,
    JumpIfEmpty = 0x54,
    JumpIfNotEmpty = 0x55,
    JumpIfSize = 0x56,
    Call = 0x57,
    Apply = 0x58,
    Return = 0x59,
    Throw = 0x5a,
    SetupCatch = 0x5b,
    EndCatch = 0x5c,

    Spawn = 0x60,
    Exit = 0x61,
    Send = 0x62,
    Receive = 0x63,
    Block = 0x64,
    Yield = 0x65,
    Restore = 0x66,

    Head = 0x70,
    Tail = 0x71,
    Reverse = 0x72,
    Unpack = 0x73,

    BuildPair = 0x80,
    BuildList = 0x81,
    BuildQuoted = 0x82,
    BuildQuasiquoted = 0x83,
    BuildUnquoted = 0x84,
    BuildFunction = 0x85,
    BuildMacro = 0x86,
    BuildRule = 0x87,
    BuildPattern = 0x88,
    BuildTemplate = 0x89,
    BuildContinuation = 0x8a,
    BuildModule = 0x8b,

    Eval = 0x90,
}

impl Opcode {
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        use Opcode::*;
        Some(match byte {
            0x00 => Nop,
            0x10 => Duplicate,
            0x11 => Rotate,
            0x12 => Pop,
            0x13 => Store,
            0x14 => Load,
            0x15 => LoadField,
            0x16 => LoadConstant,
            0x17 => LoadCode,
            0x18 => LoadModule,
            0x20 => Negate,
            0x21 => Add,
            0x22 => Sub,
            0x23 => Mul,
            0x24 => Div,
            0x25 => Pow,
            0x26 => Mod,
            0x27 => Rem,
            0x28 => Round,
            0x29 => Floor,
            0x2a => Ceil,
            0x30 => BitNot,
            0x31 => BitAnd,
            0x32 => BitOr,
            0x33 => BitXor,
            0x34 => BitShiftLeft,
            0x35 => BitShiftRight,
            0x40 => LogicNot,
            0x41 => LogicAnd,
            0x42 => LogicOr,
            0x43 => LogicXor,
            0x44 => Type,
            0x45 => Equal,
            0x46 => NotEqual,
            0x47 => Greater,
            0x48 => GreaterEqual,
            0x49 => Less,
            0x4a => LessEqual,
            0x50 => Jump,
            0x51 => JumpIfNil,
            0x52 => JumpIfTrue,
            0x53 => JumpIfFalse,
            0x54 => JumpIfEmpty,
            0x55 => JumpIfNotEmpty,
            0x56 => JumpIfSize,
            0x57 => Call,
            0x58 => Apply,
            0x59 => Return,
            0x5a => Throw,
            0x5b => SetupCatch,
            0x5c => EndCatch,
            0x60 => Spawn,
            0x61 => Exit,
            0x62 => Send,
            0x63 => Receive,
            0x64 => Block,
            0x65 => Yield,
            0x66 => Restore,
            0x70 => Head,
            0x71 => Tail,
            0x72 => Reverse,
            0x73 => Unpack,
            0x80 => BuildPair,
            0x81 => BuildList,
            0x82 => BuildQuoted,
            0x83 => BuildQuasiquoted,
            0x84 => BuildUnquoted,
            0x85 => BuildFunction,
            0x86 => BuildMacro,
            0x87 => BuildRule,
            0x88 => BuildPattern,
            0x89 => BuildTemplate,
            0x8a => BuildContinuation,
            0x8b => BuildModule,
            0x90 => Eval,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_opcode_byte() {
        let all = [
            Opcode::Nop, Opcode::Duplicate, Opcode::Rotate, Opcode::Pop, Opcode::Store,
            Opcode::Load, Opcode::LoadField, Opcode::LoadConstant, Opcode::LoadCode,
            Opcode::LoadModule, Opcode::Negate, Opcode::Add, Opcode::Sub, Opcode::Mul,
            Opcode::Div, Opcode::Pow, Opcode::Mod, Opcode::Rem, Opcode::Round, Opcode::Floor,
            Opcode::Ceil, Opcode::BitNot, Opcode::BitAnd, Opcode::BitOr, Opcode::BitXor,
            Opcode::BitShiftLeft, Opcode::BitShiftRight, Opcode::LogicNot, Opcode::LogicAnd,
            Opcode::LogicOr, Opcode::LogicXor, Opcode::Type, Opcode::Equal, Opcode::NotEqual,
            Opcode::Greater, Opcode::GreaterEqual, Opcode::Less, Opcode::LessEqual, Opcode::Jump,
            Opcode::JumpIfNil, Opcode::JumpIfTrue, Opcode::JumpIfFalse, Opcode::JumpIfEmpty,
            Opcode::JumpIfNotEmpty, Opcode::JumpIfSize, Opcode::Call, Opcode::Apply,
            Opcode::Return, Opcode::Throw, Opcode::SetupCatch, Opcode::EndCatch, Opcode::Spawn,
            Opcode::Exit, Opcode::Send, Opcode::Receive, Opcode::Block, Opcode::Yield,
            Opcode::Restore, Opcode::Head, Opcode::Tail, Opcode::Reverse, Opcode::Unpack,
            Opcode::BuildPair, Opcode::BuildList, Opcode::BuildQuoted, Opcode::BuildQuasiquoted,
            Opcode::BuildUnquoted, Opcode::BuildFunction, Opcode::BuildMacro, Opcode::BuildRule,
            Opcode::BuildPattern, Opcode::BuildTemplate, Opcode::BuildContinuation,
            Opcode::BuildModule, Opcode::Eval,
        ];
        for op in all {
            assert_eq!(Opcode::from_byte(op as u8), Some(op));
        }
    }

    #[test]
    fn unknown_byte_is_none() {
        assert_eq!(Opcode::from_byte(0xff), None);
    }
}
