//! Test data generators for integration tests.
//!
//! Scripts and outpoints are derived from a global counter, so every call
//! yields fresh bytes while runs stay reproducible.

use std::sync::atomic::{AtomicU64, Ordering};
use txadmit_consensus::params::CENT;
use txadmit_consensus::{blake2b256, OutPoint, Transaction, TransactionRef, TxIn, TxOut, Txid};

/// Global counter for unique data generation
static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fresh 32 bytes.
pub fn test_bytes32() -> [u8; 32] {
    let counter = COUNTER.fetch_add(1, Ordering::SeqCst);
    blake2b256(&counter.to_le_bytes())
}

/// Fresh outpoint that exists nowhere.
pub fn test_outpoint() -> OutPoint {
    OutPoint::new(Txid::from_bytes(test_bytes32()), 0)
}

/// Script made of two 32-byte pushes (66 bytes).
pub fn test_script() -> Vec<u8> {
    let mut script = Vec::with_capacity(66);
    script.push(0x20);
    script.extend_from_slice(&test_bytes32());
    script.push(0x20);
    script.extend_from_slice(&test_bytes32());
    script
}

/// Transaction with no meaning: unknown inputs, 1 CENT outputs.
///
/// Each input is 107 bytes and each output 75 bytes, so size grows
/// linearly with the counts.
pub fn create_placeholder_tx(num_inputs: usize, num_outputs: usize) -> TransactionRef {
    let script = test_script();
    let inputs = (0..num_inputs)
        .map(|_| {
            let mut input = TxIn::new(test_outpoint());
            input.script_sig = script.clone();
            input
        })
        .collect();
    let outputs = (0..num_outputs)
        .map(|_| TxOut::new(CENT, script.clone()))
        .collect();
    Transaction::new(2, inputs, outputs, 0).into_ref()
}

/// Transaction spending `prev:vout` into a single output of `value`.
pub fn spend_output(prev: &Transaction, vout: u32, value: u64) -> TransactionRef {
    spend_outpoint(OutPoint::new(prev.txid(), vout), value)
}

/// Transaction spending `outpoint` into a single output of `value`.
pub fn spend_outpoint(outpoint: OutPoint, value: u64) -> TransactionRef {
    let mut input = TxIn::new(outpoint);
    input.witness = vec![test_bytes32().to_vec()];
    Transaction::new(2, vec![input], vec![TxOut::new(value, test_script())], 0).into_ref()
}

/// Chain of `len` transactions, each spending output 0 of the previous one
/// and paying `fee`. The first spends `funding` worth `funding_value`.
pub fn create_chain(
    funding: OutPoint,
    funding_value: u64,
    len: usize,
    fee: u64,
) -> Vec<TransactionRef> {
    let mut chain: Vec<TransactionRef> = Vec::with_capacity(len);
    let mut value = funding_value;
    for _ in 0..len {
        value = value.saturating_sub(fee);
        let tx = match chain.last() {
            Some(prev) => spend_output(prev, 0, value),
            None => spend_outpoint(funding, value),
        };
        chain.push(tx);
    }
    chain
}

/// Parent with `n` outputs and `n` children, each spending one of them.
pub fn create_fan_out(
    funding: OutPoint,
    funding_value: u64,
    n: usize,
    fee: u64,
) -> Vec<TransactionRef> {
    let per_output = (funding_value - fee) / n as u64;
    let parent = Transaction::new(
        2,
        vec![TxIn::new(funding)],
        (0..n).map(|_| TxOut::new(per_output, test_script())).collect(),
        0,
    )
    .into_ref();

    let mut package = vec![parent.clone()];
    for vout in 0..n {
        package.push(spend_output(&parent, vout as u32, per_output - fee));
    }
    package
}
