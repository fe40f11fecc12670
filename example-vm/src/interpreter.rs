//! A small EVM subset.
//!
//! Supported: STOP, ADD, ADDRESS, BALANCE, CALLDATALOAD, EXTCODESIZE,
//! EXTCODECOPY, EXTCODEHASH, BLOCKHASH, NUMBER, MSTORE, SLOAD, SSTORE,
//! MSIZE, PUSH1–PUSH32, DUP1, LOG0–LOG4, CALL, RETURN, REVERT (Byzantium
//! and later), SELFDESTRUCT.
//!
//! Gas is flat: 1 per instruction, nothing for memory or host access.
//! Offsets and sizes must fit in 32 bits. Any failure other than REVERT
//! consumes all remaining gas. Negative starting gas is out of gas, and an
//! execution starting at `DEPTH_LIMIT` or deeper fails with
//! `CALL_DEPTH_EXCEEDED`.

use std::ops::Range;

use evmlink_hostapi::HostContext;
use evmlink_primitives::{
    Bytes32, CallKind, Message, Revision, StatusCode, StorageStatus, FLAG_STATIC,
};
use tracing::trace;

/// Memory capacity in bytes.
pub const MEMORY_LIMIT: usize = 1024;

/// Stack capacity in words.
pub const STACK_LIMIT: usize = 1024;

/// Deepest call depth an execution may start at.
pub const DEPTH_LIMIT: i32 = 1024;

/// Refund granted for clearing a storage slot (EIP-3529).
const CLEAR_REFUND: i64 = 4800;

mod op {
    pub const STOP: u8 = 0x00;
    pub const ADD: u8 = 0x01;
    pub const ADDRESS: u8 = 0x30;
    pub const BALANCE: u8 = 0x31;
    pub const CALLDATALOAD: u8 = 0x35;
    pub const EXTCODESIZE: u8 = 0x3b;
    pub const EXTCODECOPY: u8 = 0x3c;
    pub const EXTCODEHASH: u8 = 0x3f;
    pub const BLOCKHASH: u8 = 0x40;
    pub const NUMBER: u8 = 0x43;
    pub const MSTORE: u8 = 0x52;
    pub const SLOAD: u8 = 0x54;
    pub const SSTORE: u8 = 0x55;
    pub const MSIZE: u8 = 0x59;
    pub const PUSH1: u8 = 0x60;
    pub const PUSH32: u8 = 0x7f;
    pub const DUP1: u8 = 0x80;
    pub const LOG0: u8 = 0xa0;
    pub const LOG4: u8 = 0xa4;
    pub const CALL: u8 = 0xf1;
    pub const RETURN: u8 = 0xf3;
    pub const REVERT: u8 = 0xfd;
    pub const SELFDESTRUCT: u8 = 0xff;
}

/// Result of interpreting one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: StatusCode,
    pub gas_left: i64,
    pub gas_refund: i64,
    pub output: Vec<u8>,
}

impl Outcome {
    /// A failure that consumed all gas.
    fn failure(status: StatusCode) -> Self {
        Self {
            status,
            gas_left: 0,
            gas_refund: 0,
            output: Vec::new(),
        }
    }
}

/// How execution stopped without an error.
enum Halt {
    Stop,
    Return(Vec<u8>),
    Revert(Vec<u8>),
}

struct Memory {
    bytes: Vec<u8>,
    size: usize,
}

impl Memory {
    fn new() -> Self {
        Self {
            bytes: vec![0u8; MEMORY_LIMIT],
            size: 0,
        }
    }

    /// Touch `[offset, offset + len)`. A zero-length region touches nothing.
    fn region(&mut self, offset: usize, len: usize) -> Result<Range<usize>, StatusCode> {
        if len == 0 {
            return Ok(0..0);
        }
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= MEMORY_LIMIT)
            .ok_or(StatusCode::INVALID_MEMORY_ACCESS)?;
        self.size = self.size.max(end);
        Ok(offset..end)
    }
}

struct Machine<'h> {
    host: &'h mut dyn HostContext,
    stack: Vec<Bytes32>,
    memory: Memory,
    gas: i64,
    refund: i64,
}

impl Machine<'_> {
    fn push(&mut self, value: Bytes32) -> Result<(), StatusCode> {
        if self.stack.len() >= STACK_LIMIT {
            return Err(StatusCode::STACK_OVERFLOW);
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Bytes32, StatusCode> {
        self.stack.pop().ok_or(StatusCode::STACK_UNDERFLOW)
    }

    fn pop_usize(&mut self) -> Result<usize, StatusCode> {
        let word = self.pop()?;
        word.to_u64()
            .filter(|v| *v <= u32::MAX as u64)
            .map(|v| v as usize)
            .ok_or(StatusCode::INVALID_MEMORY_ACCESS)
    }
}

/// Interpret `msg.code` against `host`.
pub fn execute(
    host: &mut dyn HostContext,
    revision: Revision,
    msg: &Message<'_>,
    verbose: i32,
) -> Outcome {
    if msg.gas < 0 {
        return Outcome::failure(StatusCode::OUT_OF_GAS);
    }
    if msg.depth >= DEPTH_LIMIT {
        return Outcome::failure(StatusCode::CALL_DEPTH_EXCEEDED);
    }

    let mut machine = Machine {
        host,
        stack: Vec::new(),
        memory: Memory::new(),
        gas: msg.gas,
        refund: 0,
    };

    match run(&mut machine, revision, msg, verbose) {
        Ok(Halt::Stop) => Outcome {
            status: StatusCode::SUCCESS,
            gas_left: machine.gas,
            gas_refund: machine.refund,
            output: Vec::new(),
        },
        Ok(Halt::Return(output)) => Outcome {
            status: StatusCode::SUCCESS,
            gas_left: machine.gas,
            gas_refund: machine.refund,
            output,
        },
        Ok(Halt::Revert(output)) => Outcome {
            status: StatusCode::REVERT,
            gas_left: machine.gas,
            gas_refund: 0,
            output,
        },
        Err(status) => Outcome::failure(status),
    }
}

fn run(
    m: &mut Machine<'_>,
    revision: Revision,
    msg: &Message<'_>,
    verbose: i32,
) -> Result<Halt, StatusCode> {
    let code = msg.code;
    let is_static = msg.is_static();
    let mut pc = 0usize;

    while pc < code.len() {
        m.gas -= 1;
        if m.gas < 0 {
            return Err(StatusCode::OUT_OF_GAS);
        }

        let opcode = code[pc];
        if verbose >= 2 {
            trace!(pc, opcode, gas = m.gas, stack = m.stack.len(), "step");
        }

        match opcode {
            op::STOP => return Ok(Halt::Stop),
            op::ADD => {
                let a = m.pop()?;
                let b = m.pop()?;
                m.push(wrapping_add(&a, &b))?;
            }
            op::ADDRESS => m.push(msg.recipient.into())?,
            op::BALANCE => {
                let address = m.pop()?.to_address();
                m.host.access_account(&address);
                let balance = m.host.get_balance(&address);
                m.push(balance)?;
            }
            op::CALLDATALOAD => {
                let offset = m.pop()?.to_u64().map(|v| v as usize).unwrap_or(usize::MAX);
                let mut word = [0u8; 32];
                if let Some(tail) = msg.input.get(offset..) {
                    let n = tail.len().min(32);
                    word[..n].copy_from_slice(&tail[..n]);
                }
                m.push(Bytes32(word))?;
            }
            op::EXTCODESIZE => {
                let address = m.pop()?.to_address();
                let size = m.host.get_code_size(&address);
                m.push(Bytes32::from_u64(size as u64))?;
            }
            op::EXTCODECOPY => {
                let address = m.pop()?.to_address();
                let dest = m.pop_usize()?;
                let code_offset = m.pop()?.to_u64().map(|v| v as usize).unwrap_or(usize::MAX);
                let size = m.pop_usize()?;
                let range = m.memory.region(dest, size)?;
                let buffer = &mut m.memory.bytes[range];
                let written = m.host.copy_code(&address, code_offset, buffer);
                buffer[written..].fill(0);
            }
            op::EXTCODEHASH => {
                let address = m.pop()?.to_address();
                let hash = if m.host.account_exists(&address) {
                    m.host.get_code_hash(&address)
                } else {
                    Bytes32::ZERO
                };
                m.push(hash)?;
            }
            op::BLOCKHASH => {
                let number = m.pop()?.to_u64().and_then(|v| i64::try_from(v).ok());
                let hash = match number {
                    Some(n) => m.host.get_block_hash(n),
                    None => Bytes32::ZERO,
                };
                m.push(hash)?;
            }
            op::NUMBER => {
                let number = m.host.get_tx_context().block_number;
                m.push(Bytes32::from_u64(number.max(0) as u64))?;
            }
            op::MSTORE => {
                let offset = m.pop_usize()?;
                let value = m.pop()?;
                let range = m.memory.region(offset, 32)?;
                m.memory.bytes[range].copy_from_slice(value.as_bytes());
            }
            op::SLOAD => {
                let key = m.pop()?;
                m.host.access_storage(&msg.recipient, &key);
                let value = m.host.get_storage(&msg.recipient, &key);
                m.push(value)?;
            }
            op::SSTORE => {
                if is_static {
                    return Err(StatusCode::STATIC_MODE_VIOLATION);
                }
                let key = m.pop()?;
                let value = m.pop()?;
                if m.host.set_storage(&msg.recipient, &key, &value) == StorageStatus::Deleted {
                    m.refund += CLEAR_REFUND;
                }
            }
            op::MSIZE => {
                let size = m.memory.size as u64;
                m.push(Bytes32::from_u64(size))?;
            }
            op::PUSH1..=op::PUSH32 => {
                let n = (opcode - op::PUSH1 + 1) as usize;
                let start = pc + 1;
                let end = (start + n).min(code.len());
                // Immediate bytes past the end of code read as zero.
                let mut word = [0u8; 32];
                let avail = end.saturating_sub(start);
                word[32 - n..32 - n + avail].copy_from_slice(&code[start.min(end)..end]);
                m.push(Bytes32(word))?;
                pc += n;
            }
            op::DUP1 => {
                let top = *m.stack.last().ok_or(StatusCode::STACK_UNDERFLOW)?;
                m.push(top)?;
            }
            op::LOG0..=op::LOG4 => {
                if is_static {
                    return Err(StatusCode::STATIC_MODE_VIOLATION);
                }
                let offset = m.pop_usize()?;
                let size = m.pop_usize()?;
                let count = (opcode - op::LOG0) as usize;
                let mut topics = Vec::with_capacity(count);
                for _ in 0..count {
                    topics.push(m.pop()?);
                }
                let range = m.memory.region(offset, size)?;
                m.host.emit_log(&msg.recipient, &topics, &m.memory.bytes[range]);
            }
            op::CALL => {
                let gas = m
                    .pop()?
                    .to_u64()
                    .map(|g| g.min(i64::MAX as u64) as i64)
                    .unwrap_or(i64::MAX);
                let recipient = m.pop()?.to_address();
                let value = m.pop()?;
                let in_offset = m.pop_usize()?;
                let in_size = m.pop_usize()?;
                let out_offset = m.pop_usize()?;
                let out_size = m.pop_usize()?;
                if is_static && !value.is_zero() {
                    return Err(StatusCode::STATIC_MODE_VIOLATION);
                }

                let input_range = m.memory.region(in_offset, in_size)?;
                let output_range = m.memory.region(out_offset, out_size)?;
                let depth = msg
                    .depth
                    .checked_add(1)
                    .ok_or(StatusCode::CALL_DEPTH_EXCEEDED)?;
                let call_msg = Message {
                    kind: CallKind::Call,
                    flags: msg.flags & FLAG_STATIC,
                    depth,
                    gas,
                    recipient,
                    sender: msg.recipient,
                    input: &m.memory.bytes[input_range],
                    value,
                    code_address: recipient,
                    ..Message::default()
                };
                let result = m.host.call(&call_msg);

                let n = result.output.len().min(output_range.len());
                let dest = output_range.start;
                m.memory.bytes[dest..dest + n].copy_from_slice(&result.output[..n]);
                m.push(Bytes32::from_u64(result.status.is_success() as u64))?;
            }
            op::RETURN | op::REVERT => {
                if opcode == op::REVERT && revision < Revision::Byzantium {
                    return Err(StatusCode::UNDEFINED_INSTRUCTION);
                }
                let offset = m.pop_usize()?;
                let size = m.pop_usize()?;
                let range = m.memory.region(offset, size)?;
                let output = m.memory.bytes[range].to_vec();
                return Ok(if opcode == op::RETURN {
                    Halt::Return(output)
                } else {
                    Halt::Revert(output)
                });
            }
            op::SELFDESTRUCT => {
                if is_static {
                    return Err(StatusCode::STATIC_MODE_VIOLATION);
                }
                let beneficiary = m.pop()?.to_address();
                m.host.selfdestruct(&msg.recipient, &beneficiary);
                return Ok(Halt::Stop);
            }
            _ => return Err(StatusCode::UNDEFINED_INSTRUCTION),
        }
        pc += 1;
    }

    Ok(Halt::Stop)
}

/// 256-bit addition modulo 2^256.
fn wrapping_add(a: &Bytes32, b: &Bytes32) -> Bytes32 {
    let mut out = [0u8; 32];
    let mut carry = 0u16;
    for i in (0..32).rev() {
        let sum = a.0[i] as u16 + b.0[i] as u16 + carry;
        out[i] = sum as u8;
        carry = sum >> 8;
    }
    Bytes32(out)
}
