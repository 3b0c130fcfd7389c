//! `OP_RETURN` data outputs.

use bitcoin::opcodes::all::OP_RETURN;
use bitcoin::script::{Instruction, PushBytesBuf};
use bitcoin::{Script, ScriptBuf};

use crate::TransactionError;

/// Largest payload a data output accepts: the script element size limit.
pub const MAX_DATA_PAYLOAD: usize = 520;

/// Build the provably-unspendable script `OP_RETURN <payload>`.
///
/// # Arguments
/// * `payload` - The bytes to carry, at most [`MAX_DATA_PAYLOAD`].
///
/// # Returns
/// The locking script, or `PayloadTooLarge`.
pub fn data_output_script(payload: &[u8]) -> Result<ScriptBuf, TransactionError> {
    let too_large = || TransactionError::PayloadTooLarge {
        size: payload.len(),
        max: MAX_DATA_PAYLOAD,
    };
    if payload.len() > MAX_DATA_PAYLOAD {
        return Err(too_large());
    }
    let push = PushBytesBuf::try_from(payload.to_vec()).map_err(|_| too_large())?;
    Ok(ScriptBuf::new_op_return(push))
}

/// Recover the payload of a data output.
///
/// Only `OP_RETURN` followed by exactly one data push matches; any other
/// script yields `None`.
pub fn extract_data_payload(script: &Script) -> Option<Vec<u8>> {
    let mut instructions = script.instructions();

    match instructions.next()? {
        Ok(Instruction::Op(op)) if op == OP_RETURN => {}
        _ => return None,
    }
    let payload = match instructions.next()? {
        Ok(Instruction::PushBytes(bytes)) => bytes.as_bytes().to_vec(),
        _ => return None,
    };
    if instructions.next().is_some() {
        return None;
    }
    Some(payload)
}
