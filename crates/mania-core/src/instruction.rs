use crate::error::CoreError;
use crate::opcode::Opcode;

/// A single bytecode instruction. Operand-carrying variants store their
/// operands as `u32`s; the binary encoding writes each as 4
/// little-endian bytes after the one-byte opcode tag, so every
/// instruction's on-disk size is computable from its opcode alone
/// (`1 + 4 * operand_count`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Nop,
    Duplicate(u32),
    Rotate(u32),
    Pop(u32),
    Store(u32),
    Load(u32),
    LoadField(u32),
    LoadConstant(u32),
    LoadCode(u32, u32),
    LoadModule(u32),

    Negate,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Mod,
    Rem,
    Round,
    Floor,
    Ceil,

    BitNot,
    BitAnd,
    BitOr,
    BitXor,
    BitShiftLeft,
    BitShiftRight,

    LogicNot,
    LogicAnd,
    LogicOr,
    LogicXor,
    Type,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    Jump(u32),
    JumpIfNil(u32),
    JumpIfTrue(u32),
    JumpIfFalse(u32),
    JumpIfEmpty(u32),
    JumpIfNotEmpty(u32),
    JumpIfSize(u32, u32),
    Call(u32),
    Apply(u32),
    Return,
    Throw,
    SetupCatch(u32),
    EndCatch,

    Spawn,
    Exit,
    Send,
    Receive,
    Block,
    Yield,
    Restore,

    Head,
    Tail,
    Reverse,
    Unpack,

    BuildPair,
    BuildList,
    BuildQuoted,
    BuildQuasiquoted,
    BuildUnquoted,
    BuildFunction,
    BuildMacro(u32),
    BuildRule,
    BuildPattern,
    BuildTemplate(u32),
    BuildContinuation,
    BuildModule,

    Eval,
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        use Instruction as I;
        match self {
            I::Nop => Opcode::Nop,
            I::Duplicate(_) => Opcode::Duplicate,
            I::Rotate(_) => Opcode::Rotate,
            I::Pop(_) => Opcode::Pop,
            I::Store(_) => Opcode::Store,
            I::Load(_) => Opcode::Load,
            I::LoadField(_) => Opcode::LoadField,
            I::LoadConstant(_) => Opcode::LoadConstant,
            I::LoadCode(_, _) => Opcode::LoadCode,
            I::LoadModule(_) => Opcode::LoadModule,
            I::Negate => Opcode::Negate,
            I::Add => Opcode::Add,
            I::Sub => Opcode::Sub,
            I::Mul => Opcode::Mul,
            I::Div => Opcode::Div,
            I::Pow => Opcode::Pow,
            I::Mod => Opcode::Mod,
            I::Rem => Opcode::Rem,
            I::Round => Opcode::Round,
            I::Floor => Opcode::Floor,
            I::Ceil => Opcode::Ceil,
            I::BitNot => Opcode::BitNot,
            I::BitAnd => Opcode::BitAnd,
            I::BitOr => Opcode::BitOr,
            I::BitXor => Opcode::BitXor,
            I::BitShiftLeft => Opcode::BitShiftLeft,
            I::BitShiftRight => Opcode::BitShiftRight,
            I::LogicNot => Opcode::LogicNot,
            I::LogicAnd => Opcode::LogicAnd,
            I::LogicOr => Opcode::LogicOr,
            I::LogicXor => Opcode::LogicXor,
            I::Type => Opcode::Type,
            I::Equal => Opcode::Equal,
            I::NotEqual => Opcode::NotEqual,
            I::Greater => Opcode::Greater,
            I::GreaterEqual => Opcode::GreaterEqual,
            I::Less => Opcode::Less,
            I::LessEqual => Opcode::LessEqual,
            I::Jump(_) => Opcode::Jump,
            I::JumpIfNil(_) => Opcode::JumpIfNil,
            I::JumpIfTrue(_) => Opcode::JumpIfTrue,
            I::JumpIfFalse(_) => Opcode::JumpIfFalse,
            I::JumpIfEmpty(_) => Opcode::JumpIfEmpty,
            I::JumpIfNotEmpty(_) => Opcode::JumpIfNotEmpty,
            I::JumpIfSize(_, _) => Opcode::JumpIfSize,
            I::Call(_) => Opcode::Call,
            I::Apply(_) => Opcode::Apply,
            I::Return => Opcode::Return,
            I::Throw => Opcode::Throw,
            I::SetupCatch(_) => Opcode::SetupCatch,
            I::EndCatch => Opcode::EndCatch,
            I::Spawn => Opcode::Spawn,
            I::Exit => Opcode::Exit,
            I::Send => Opcode::Send,
            I::Receive => Opcode::Receive,
            I::Block => Opcode::Block,
            I::Yield => Opcode::Yield,
            I::Restore => Opcode::Restore,
            I::Head => Opcode::Head,
            I::Tail => Opcode::Tail,
            I::Reverse => Opcode::Reverse,
            I::Unpack => Opcode::Unpack,
            I::BuildPair => Opcode::BuildPair,
            I::BuildList => Opcode::BuildList,
            I::BuildQuoted => Opcode::BuildQuoted,
            I::BuildQuasiquoted => Opcode::BuildQuasiquoted,
            I::BuildUnquoted => Opcode::BuildUnquoted,
            I::BuildFunction => Opcode::BuildFunction,
            I::BuildMacro(_) => Opcode::BuildMacro,
            I::BuildRule => Opcode::BuildRule,
            I::BuildPattern => Opcode::BuildPattern,
            I::BuildTemplate(_) => Opcode::BuildTemplate,
            I::BuildContinuation => Opcode::BuildContinuation,
            I::BuildModule => Opcode::BuildModule,
            I::Eval => Opcode::Eval,
        }
    }

    /// Total on-disk size in bytes, including the opcode tag.
    pub fn encoded_len(&self) -> u32 {
        1 + 4 * self.operand_count()
    }

    fn operand_count(&self) -> u32 {
        use Instruction as I;
        match self {
            I::LoadCode(_, _) | I::JumpIfSize(_, _) => 2,
            I::Nop
            | I::Negate
            | I::Add
            | I::Sub
            | I::Mul
            | I::Div
            | I::Pow
            | I::Mod
            | I::Rem
            | I::Round
            | I::Floor
            | I::Ceil
            | I::BitNot
            | I::BitAnd
            | I::BitOr
            | I::BitXor
            | I::BitShiftLeft
            | I::BitShiftRight
            | I::LogicNot
            | I::LogicAnd
            | I::LogicOr
            | I::LogicXor
            | I::Type
            | I::Equal
            | I::NotEqual
            | I::Greater
            | I::GreaterEqual
            | I::Less
            | I::LessEqual
            | I::Return
            | I::Throw
            | I::EndCatch
            | I::Spawn
            | I::Exit
            | I::Send
            | I::Receive
            | I::Block
            | I::Yield
            | I::Restore
            | I::Head
            | I::Tail
            | I::Reverse
            | I::Unpack
            | I::BuildPair
            | I::BuildList
            | I::BuildQuoted
            | I::BuildQuasiquoted
            | I::BuildUnquoted
            | I::BuildFunction
            | I::BuildRule
            | I::BuildPattern
            | I::BuildContinuation
            | I::BuildModule
            | I::Eval => 0,
            _ => 1,
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        use Instruction as I;
        out.push(self.opcode() as u8);
        match *self {
            I::Duplicate(n)
            | I::Rotate(n)
            | I::Pop(n)
            | I::Store(n)
            | I::Load(n)
            | I::LoadField(n)
            | I::LoadConstant(n)
            | I::LoadModule(n)
            | I::Jump(n)
            | I::JumpIfNil(n)
            | I::JumpIfTrue(n)
            | I::JumpIfFalse(n)
            | I::JumpIfEmpty(n)
            | I::JumpIfNotEmpty(n)
            | I::Call(n)
            | I::Apply(n)
            | I::SetupCatch(n)
            | I::BuildMacro(n)
            | I::BuildTemplate(n) => out.extend_from_slice(&n.to_le_bytes()),
            I::LoadCode(a, b) | I::JumpIfSize(a, b) => {
                out.extend_from_slice(&a.to_le_bytes());
                out.extend_from_slice(&b.to_le_bytes());
            }
            _ => {}
        }
    }

    /// Decodes one instruction starting at `bytes[pos]`. Returns the
    /// instruction and the position just past it.
    pub fn decode(bytes: &[u8], pos: u32) -> Result<(Instruction, u32), CoreError> {
        let p = pos as usize;
        let byte = *bytes
            .get(p)
            .ok_or_else(|| CoreError::Decode(format!("truncated instruction at {pos}")))?;
        let opcode = Opcode::from_byte(byte)
            .ok_or_else(|| CoreError::Decode(format!("unknown opcode byte 0x{byte:02x}")))?;

        let read_u32 = |at: usize| -> Result<u32, CoreError> {
            let slice = bytes
                .get(at..at + 4)
                .ok_or_else(|| CoreError::Decode("truncated operand".into()))?;
            Ok(u32::from_le_bytes(slice.try_into().unwrap()))
        };

        use Opcode::*;
        let (instr, len): (Instruction, u32) = match opcode {
            Nop => (Instruction::Nop, 1),
            Duplicate => (Instruction::Duplicate(read_u32(p + 1)?), 5),
            Rotate => (Instruction::Rotate(read_u32(p + 1)?), 5),
            Pop => (Instruction::Pop(read_u32(p + 1)?), 5),
            Store => (Instruction::Store(read_u32(p + 1)?), 5),
            Load => (Instruction::Load(read_u32(p + 1)?), 5),
            LoadField => (Instruction::LoadField(read_u32(p + 1)?), 5),
            LoadConstant => (Instruction::LoadConstant(read_u32(p + 1)?), 5),
            LoadCode => (
                Instruction::LoadCode(read_u32(p + 1)?, read_u32(p + 5)?),
                9,
            ),
            LoadModule => (Instruction::LoadModule(read_u32(p + 1)?), 5),
            Negate => (Instruction::Negate, 1),
            Add => (Instruction::Add, 1),
            Sub => (Instruction::Sub, 1),
            Mul => (Instruction::Mul, 1),
            Div => (Instruction::Div, 1),
            Pow => (Instruction::Pow, 1),
            Mod => (Instruction::Mod, 1),
            Rem => (Instruction::Rem, 1),
            Round => (Instruction::Round, 1),
            Floor => (Instruction::Floor, 1),
            Ceil => (Instruction::Ceil, 1),
            BitNot => (Instruction::BitNot, 1),
            BitAnd => (Instruction::BitAnd, 1),
            BitOr => (Instruction::BitOr, 1),
            BitXor => (Instruction::BitXor, 1),
            BitShiftLeft => (Instruction::BitShiftLeft, 1),
            BitShiftRight => (Instruction::BitShiftRight, 1),
            LogicNot => (Instruction::LogicNot, 1),
            LogicAnd => (Instruction::LogicAnd, 1),
            LogicOr => (Instruction::LogicOr, 1),
            LogicXor => (Instruction::LogicXor, 1),
            Type => (Instruction::Type, 1),
            Equal => (Instruction::Equal, 1),
            NotEqual => (Instruction::NotEqual, 1),
            Greater => (Instruction::Greater, 1),
            GreaterEqual => (Instruction::GreaterEqual, 1),
            Less => (Instruction::Less, 1),
            LessEqual => (Instruction::LessEqual, 1),
            Jump => (Instruction::Jump(read_u32(p + 1)?), 5),
            JumpIfNil => (Instruction::JumpIfNil(read_u32(p + 1)?), 5),
            JumpIfTrue => (Instruction::JumpIfTrue(read_u32(p + 1)?), 5),
            JumpIfFalse => (Instruction::JumpIfFalse(read_u32(p + 1)?), 5),
            JumpIfEmpty => (Instruction::JumpIfEmpty(read_u32(p + 1)?), 5),
            JumpIfNotEmpty => (Instruction::JumpIfNotEmpty(read_u32(p + 1)?), 5),
            JumpIfSize => (
                Instruction::JumpIfSize(read_u32(p + 1)?, read_u32(p + 5)?),
                9,
            ),
            Call => (Instruction::Call(read_u32(p + 1)?), 5),
            Apply => (Instruction::Apply(read_u32(p + 1)?), 5),
            Return => (Instruction::Return, 1),
            Throw => (Instruction::Throw, 1),
            SetupCatch => (Instruction::SetupCatch(read_u32(p + 1)?), 5),
            EndCatch => (Instruction::EndCatch, 1),
            Spawn => (Instruction::Spawn, 1),
            Exit => (Instruction::Exit, 1),
            Send => (Instruction::Send, 1),
            Receive => (Instruction::Receive, 1),
            Block => (Instruction::Block, 1),
            Yield => (Instruction::Yield, 1),
            Restore => (Instruction::Restore, 1),
            Head => (Instruction::Head, 1),
            Tail => (Instruction::Tail, 1),
            Reverse => (Instruction::Reverse, 1),
            Unpack => (Instruction::Unpack, 1),
            BuildPair => (Instruction::BuildPair, 1),
            BuildList => (Instruction::BuildList, 1),
            BuildQuoted => (Instruction::BuildQuoted, 1),
            BuildQuasiquoted => (Instruction::BuildQuasiquoted, 1),
            BuildUnquoted => (Instruction::BuildUnquoted, 1),
            BuildFunction => (Instruction::BuildFunction, 1),
            BuildMacro => (Instruction::BuildMacro(read_u32(p + 1)?), 5),
            BuildRule => (Instruction::BuildRule, 1),
            BuildPattern => (Instruction::BuildPattern, 1),
            BuildTemplate => (Instruction::BuildTemplate(read_u32(p + 1)?), 5),
            BuildContinuation => (Instruction::BuildContinuation, 1),
            BuildModule => (Instruction::BuildModule, 1),
            Eval => (Instruction::Eval, 1),
        };
        Ok((instr, pos + len))
    }

    /// Rewrites this instruction from `Restore` to `Return`, used by the
    /// VM's tail-call/restore fusion. A no-op for anything else.
    pub fn restore_to_return(self) -> Instruction {
        match self {
            Instruction::Restore => Instruction::Return,
            other => other,
        }
    }
}

/// Decodes an entire instruction stream into a vector, used by tests and
/// by the module loader's round-trip check.
pub fn decode_all(bytes: &[u8]) -> Result<Vec<Instruction>, CoreError> {
    let mut out = Vec::new();
    let mut pos = 0u32;
    while (pos as usize) < bytes.len() {
        let (instr, next) = Instruction::decode(bytes, pos)?;
        out.push(instr);
        pos = next;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_and_decodes_zero_operand() {
        let mut buf = Vec::new();
        Instruction::Add.encode(&mut buf);
        assert_eq!(buf, vec![Opcode::Add as u8]);
        let (decoded, next) = Instruction::decode(&buf, 0).unwrap();
        assert_eq!(decoded, Instruction::Add);
        assert_eq!(next, 1);
    }

    #[test]
    fn encodes_and_decodes_one_operand() {
        let mut buf = Vec::new();
        Instruction::Load(7).encode(&mut buf);
        assert_eq!(buf.len(), 5);
        let (decoded, next) = Instruction::decode(&buf, 0).unwrap();
        assert_eq!(decoded, Instruction::Load(7));
        assert_eq!(next, 5);
    }

    #[test]
    fn encodes_and_decodes_two_operand() {
        let mut buf = Vec::new();
        Instruction::LoadCode(3, 11).encode(&mut buf);
        assert_eq!(buf.len(), 9);
        let (decoded, _) = Instruction::decode(&buf, 0).unwrap();
        assert_eq!(decoded, Instruction::LoadCode(3, 11));
    }

    #[test]
    fn decode_all_round_trips_a_sequence() {
        let program = vec![
            Instruction::LoadConstant(0),
            Instruction::LoadConstant(1),
            Instruction::Add,
            Instruction::Return,
        ];
        let mut buf = Vec::new();
        for i in &program {
            i.encode(&mut buf);
        }
        let decoded = decode_all(&buf).unwrap();
        assert_eq!(decoded, program);
    }

    #[test]
    fn restore_to_return_only_touches_restore() {
        assert_eq!(Instruction::Restore.restore_to_return(), Instruction::Return);
        assert_eq!(Instruction::Return.restore_to_return(), Instruction::Return);
        assert_eq!(Instruction::Nop.restore_to_return(), Instruction::Nop);
    }
}
