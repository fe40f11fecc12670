//! Conversions between native execution types and their wire layouts.
//!
//! Encoding is infallible. Decoding validates enum discriminants and
//! pointer/length pairs, because the other side of the boundary is not
//! trusted to stay inside the vocabulary.

use bytes::Bytes;

use crate::buffer::{borrowed_slice, OwnedResult};
use crate::error::{CodecError, StatusCode};
use crate::execution::{CallKind, ExecutionResult, Message, TxContext};
use crate::ffi::{RawMessage, RawTxContext};

/// Lay out a message for the wire. The returned value borrows `msg.input`
/// by pointer and must not outlive it.
pub fn encode_message(msg: &Message<'_>) -> RawMessage {
    RawMessage {
        kind: msg.kind.as_i32(),
        flags: msg.flags,
        depth: msg.depth,
        gas: msg.gas,
        recipient: msg.recipient,
        sender: msg.sender,
        input_data: if msg.input.is_empty() {
            core::ptr::null()
        } else {
            msg.input.as_ptr()
        },
        input_size: msg.input.len(),
        value: msg.value,
        create2_salt: msg.create2_salt,
        code_address: msg.code_address,
    }
}

/// Read a message from the wire. The message carries no code.
///
/// # Safety
///
/// `raw.input_data` must be valid for `raw.input_size` bytes for `'a`.
pub unsafe fn decode_message<'a>(raw: &RawMessage) -> Result<Message<'a>, CodecError> {
    Ok(Message {
        kind: CallKind::from_i32(raw.kind)?,
        flags: raw.flags,
        depth: raw.depth,
        gas: raw.gas,
        recipient: raw.recipient,
        sender: raw.sender,
        input: borrowed_slice(raw.input_data, raw.input_size)?,
        value: raw.value,
        create2_salt: raw.create2_salt,
        code_address: raw.code_address,
        code: &[],
    })
}

/// Copy a received result into native form. The caller keeps ownership
/// of `result` and releases it by dropping it.
///
/// `create_address` is only reported for create kinds.
pub fn decode_result(result: &OwnedResult, kind: CallKind) -> Result<ExecutionResult, CodecError> {
    let raw = result.raw();
    let output = result.output()?;
    Ok(ExecutionResult {
        status: StatusCode::from_i32(raw.status_code),
        gas_left: raw.gas_left,
        gas_refund: raw.gas_refund,
        output: Bytes::copy_from_slice(output),
        create_address: kind.is_create().then_some(raw.create_address),
    })
}

impl From<&TxContext> for RawTxContext {
    fn from(ctx: &TxContext) -> Self {
        Self {
            tx_gas_price: ctx.gas_price,
            tx_origin: ctx.origin,
            block_coinbase: ctx.coinbase,
            block_number: ctx.block_number,
            block_timestamp: ctx.block_timestamp,
            block_gas_limit: ctx.block_gas_limit,
            block_prev_randao: ctx.prev_randao,
            chain_id: ctx.chain_id,
            block_base_fee: ctx.base_fee,
        }
    }
}

impl From<&RawTxContext> for TxContext {
    fn from(raw: &RawTxContext) -> Self {
        Self {
            gas_price: raw.tx_gas_price,
            origin: raw.tx_origin,
            coinbase: raw.block_coinbase,
            block_number: raw.block_number,
            block_timestamp: raw.block_timestamp,
            block_gas_limit: raw.block_gas_limit,
            prev_randao: raw.block_prev_randao,
            chain_id: raw.chain_id,
            base_fee: raw.block_base_fee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::FLAG_STATIC;
    use crate::ffi::RawResult;
    use crate::types::{Address, Bytes32};

    fn sample_message(input: &[u8]) -> Message<'_> {
        Message {
            kind: CallKind::DelegateCall,
            flags: FLAG_STATIC,
            depth: 3,
            gas: 50_000,
            recipient: Address([1; 20]),
            sender: Address([2; 20]),
            input,
            value: Bytes32::from_u64(7),
            create2_salt: Bytes32::from_u64(9),
            code_address: Address([3; 20]),
            code: &[],
        }
    }

    #[test]
    fn test_message_fields_survive_encoding() {
        let input = b"calldata";
        let msg = sample_message(input);
        let raw = encode_message(&msg);
        assert_eq!(raw.input_data, input.as_ptr());
        let back = unsafe { decode_message(&raw) }.unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_all_zero_and_all_ones_survive_encoding() {
        let low = Address([0x00; 20]);
        let high = Address([0xff; 20]);
        let max = Bytes32([0xff; 32]);
        for (addr, other, word) in [(low, high, Bytes32::ZERO), (high, low, max)] {
            let msg = Message {
                recipient: addr,
                sender: other,
                value: word,
                create2_salt: word,
                code_address: addr,
                ..sample_message(&[])
            };
            let back = unsafe { decode_message(&encode_message(&msg)) }.unwrap();
            assert_eq!(back, msg);
        }
    }

    #[test]
    fn test_empty_input_is_null() {
        let raw = encode_message(&sample_message(&[]));
        assert!(raw.input_data.is_null());
        assert_eq!(raw.input_size, 0);
        let back = unsafe { decode_message(&raw) }.unwrap();
        assert!(back.input.is_empty());
    }

    #[test]
    fn test_decode_message_rejects_bad_kind() {
        let mut raw = encode_message(&sample_message(&[]));
        raw.kind = 42;
        assert!(matches!(
            unsafe { decode_message(&raw) },
            Err(CodecError::UnknownDiscriminant { value: 42, .. })
        ));
    }

    #[test]
    fn test_decode_message_rejects_null_input() {
        let mut raw = encode_message(&sample_message(&[]));
        raw.input_size = 4;
        assert_eq!(
            unsafe { decode_message(&raw) }.unwrap_err(),
            CodecError::NullData(4)
        );
    }

    #[test]
    fn test_create_address_only_for_create() {
        let mut raw = RawResult::empty(0, 5);
        raw.create_address = Address([0xcc; 20]);
        let owned = unsafe { OwnedResult::from_raw(raw) };

        let call = decode_result(&owned, CallKind::Call).unwrap();
        assert_eq!(call.create_address, None);
        let create = decode_result(&owned, CallKind::Create).unwrap();
        assert_eq!(create.create_address, Some(Address([0xcc; 20])));
        assert_eq!(create.gas_left, 5);
    }

    #[test]
    fn test_decode_result_copies_output() {
        let data = b"out";
        let mut raw = RawResult::empty(2, 1);
        raw.output_data = data.as_ptr();
        raw.output_size = 3;
        raw.gas_refund = 11;
        let owned = unsafe { OwnedResult::from_raw(raw) };
        let result = decode_result(&owned, CallKind::Call).unwrap();
        drop(owned);
        assert_eq!(result.status, StatusCode::REVERT);
        assert_eq!(&result.output[..], b"out");
        assert_eq!(result.gas_refund, 11);
    }

    #[test]
    fn test_tx_context_conversion() {
        let ctx = TxContext {
            gas_price: Bytes32::from_u64(1),
            origin: Address([4; 20]),
            coinbase: Address([5; 20]),
            block_number: 42,
            block_timestamp: 1_700_000_000,
            block_gas_limit: 30_000_000,
            prev_randao: Bytes32::from_u64(6),
            chain_id: Bytes32::from_u64(1),
            base_fee: Bytes32::from_u64(7),
        };
        let raw = RawTxContext::from(&ctx);
        assert_eq!(raw.block_number, 42);
        assert_eq!(TxContext::from(&raw), ctx);
    }
}
