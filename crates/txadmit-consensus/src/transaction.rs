//! Transaction primitives and their canonical serialization.
//!
//! Serialization layout (little-endian integers, compact-size length prefixes):
//!
//! ```text
//! version (4) | [marker 0x00 | flag 0x01] | inputs | outputs | [witnesses] | lock_time (4)
//! ```
//!
//! The marker, flag and witness sections are only present in the witness
//! serialization and only when at least one input carries witness data.
//! `Txid` hashes the serialization without witness data, `Wtxid` hashes the
//! full one.

use crate::params::WITNESS_SCALE_FACTOR;
use crate::{ConsensusError, ConsensusResult, Txid, Wtxid, HASH_LENGTH};
use bytes::{Buf, BufMut};
use std::fmt;
use std::sync::Arc;

/// Shared, immutable transaction handle.
pub type TransactionRef = Arc<Transaction>;

/// Reference to an output of a previous transaction.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutPoint {
    /// Transaction that created the output.
    pub txid: Txid,
    /// Output index.
    pub vout: u32,
}

impl OutPoint {
    /// Create an outpoint.
    pub const fn new(txid: Txid, vout: u32) -> Self {
        Self { txid, vout }
    }

    /// The null outpoint spent by coinbase transactions.
    pub const fn null() -> Self {
        Self {
            txid: Txid::ZERO,
            vout: u32::MAX,
        }
    }

    /// Whether this is the null outpoint.
    pub fn is_null(&self) -> bool {
        self.txid.is_zero() && self.vout == u32::MAX
    }
}

impl fmt::Debug for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// Transaction input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
    /// Output being spent.
    pub previous_output: OutPoint,
    /// Unlocking script.
    pub script_sig: Vec<u8>,
    /// Sequence number.
    pub sequence: u32,
    /// Witness stack.
    pub witness: Vec<Vec<u8>>,
}

impl TxIn {
    /// Final sequence number.
    pub const SEQUENCE_FINAL: u32 = u32::MAX;

    /// Input spending `previous_output` with an empty unlocking script.
    pub fn new(previous_output: OutPoint) -> Self {
        Self {
            previous_output,
            script_sig: Vec::new(),
            sequence: Self::SEQUENCE_FINAL,
            witness: Vec::new(),
        }
    }
}

/// Transaction output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    /// Value in base units.
    pub value: u64,
    /// Locking script.
    pub script_pubkey: Vec<u8>,
}

impl TxOut {
    /// Create an output.
    pub fn new(value: u64, script_pubkey: Vec<u8>) -> Self {
        Self {
            value,
            script_pubkey,
        }
    }
}

/// An immutable transaction with cached identities and sizes.
#[derive(Clone)]
pub struct Transaction {
    version: i32,
    inputs: Vec<TxIn>,
    outputs: Vec<TxOut>,
    lock_time: u32,
    txid: Txid,
    wtxid: Wtxid,
    base_size: usize,
    total_size: usize,
}

impl Transaction {
    /// Build a transaction and compute its identities.
    pub fn new(version: i32, inputs: Vec<TxIn>, outputs: Vec<TxOut>, lock_time: u32) -> Self {
        let mut tx = Self {
            version,
            inputs,
            outputs,
            lock_time,
            txid: Txid::ZERO,
            wtxid: Wtxid::ZERO,
            base_size: 0,
            total_size: 0,
        };

        let base = tx.encode_with(false);
        let full = tx.encode_with(true);
        tx.txid = Txid::hash(&base);
        tx.wtxid = Wtxid::hash(&full);
        tx.base_size = base.len();
        tx.total_size = full.len();
        tx
    }

    /// Wrap into a shared reference.
    pub fn into_ref(self) -> TransactionRef {
        Arc::new(self)
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn inputs(&self) -> &[TxIn] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TxOut] {
        &self.outputs
    }

    pub fn lock_time(&self) -> u32 {
        self.lock_time
    }

    /// Transaction identity.
    pub fn txid(&self) -> Txid {
        self.txid
    }

    /// Witness identity.
    pub fn wtxid(&self) -> Wtxid {
        self.wtxid
    }

    /// Whether any input carries witness data.
    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|input| !input.witness.is_empty())
    }

    /// Whether this is a coinbase transaction.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].previous_output.is_null()
    }

    /// Serialized size without witness data.
    pub fn base_size(&self) -> usize {
        self.base_size
    }

    /// Serialized size with witness data.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Weight units: base size counts `WITNESS_SCALE_FACTOR` times, witness bytes once.
    pub fn weight(&self) -> usize {
        self.base_size * (WITNESS_SCALE_FACTOR - 1) + self.total_size
    }

    /// Virtual size, rounded up.
    pub fn vsize(&self) -> usize {
        (self.weight() + WITNESS_SCALE_FACTOR - 1) / WITNESS_SCALE_FACTOR
    }

    /// Sum of output values, `None` on overflow.
    pub fn value_out(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
    }

    /// Outpoints created by this transaction.
    pub fn outpoints(&self) -> impl Iterator<Item = (OutPoint, &TxOut)> + '_ {
        let txid = self.txid;
        self.outputs
            .iter()
            .enumerate()
            .map(move |(vout, out)| (OutPoint::new(txid, vout as u32), out))
    }

    /// Full serialization, witness data included.
    pub fn encode(&self) -> Vec<u8> {
        self.encode_with(true)
    }

    fn encode_with(&self, include_witness: bool) -> Vec<u8> {
        let with_witness = include_witness && self.has_witness();
        let mut buf = Vec::with_capacity(64 + self.inputs.len() * 48 + self.outputs.len() * 40);

        buf.put_i32_le(self.version);
        if with_witness {
            buf.put_u8(0x00);
            buf.put_u8(0x01);
        }

        put_compact_size(&mut buf, self.inputs.len() as u64);
        for input in &self.inputs {
            buf.put_slice(input.previous_output.txid.as_ref());
            buf.put_u32_le(input.previous_output.vout);
            put_var_bytes(&mut buf, &input.script_sig);
            buf.put_u32_le(input.sequence);
        }

        put_compact_size(&mut buf, self.outputs.len() as u64);
        for output in &self.outputs {
            buf.put_u64_le(output.value);
            put_var_bytes(&mut buf, &output.script_pubkey);
        }

        if with_witness {
            for input in &self.inputs {
                put_compact_size(&mut buf, input.witness.len() as u64);
                for item in &input.witness {
                    put_var_bytes(&mut buf, item);
                }
            }
        }

        buf.put_u32_le(self.lock_time);
        buf
    }

    /// Parse a transaction from its witness serialization.
    ///
    /// `00 01` after the version is either the witness marker or an empty
    /// input list followed by one output; the witness reading is tried first.
    pub fn decode(bytes: &[u8]) -> ConsensusResult<Self> {
        let has_marker = bytes.len() >= 6 && bytes[4] == 0x00 && bytes[5] == 0x01;
        if !has_marker {
            return Self::decode_with(bytes, false);
        }
        match Self::decode_with(bytes, true) {
            Ok(tx) => Ok(tx),
            Err(err) => Self::decode_with(bytes, false).map_err(|_| err),
        }
    }

    fn decode_with(mut bytes: &[u8], with_witness: bool) -> ConsensusResult<Self> {
        let buf = &mut bytes;

        let version = get_i32_le(buf)?;
        if with_witness {
            buf.advance(2);
        }

        let input_count = get_compact_size(buf)? as usize;
        let mut inputs = Vec::with_capacity(input_count.min(buf.remaining()));
        for _ in 0..input_count {
            let txid = Txid::from_bytes(get_hash(buf)?);
            let vout = get_u32_le(buf)?;
            let script_sig = get_var_bytes(buf)?;
            let sequence = get_u32_le(buf)?;
            inputs.push(TxIn {
                previous_output: OutPoint::new(txid, vout),
                script_sig,
                sequence,
                witness: Vec::new(),
            });
        }

        let output_count = get_compact_size(buf)? as usize;
        let mut outputs = Vec::with_capacity(output_count.min(buf.remaining()));
        for _ in 0..output_count {
            let value = get_u64_le(buf)?;
            let script_pubkey = get_var_bytes(buf)?;
            outputs.push(TxOut::new(value, script_pubkey));
        }

        if with_witness {
            for input in inputs.iter_mut() {
                let items = get_compact_size(buf)? as usize;
                let mut witness = Vec::with_capacity(items.min(buf.remaining()));
                for _ in 0..items {
                    witness.push(get_var_bytes(buf)?);
                }
                input.witness = witness;
            }
            if inputs.iter().all(|input| input.witness.is_empty()) {
                return Err(ConsensusError::Decode("Superfluous witness record".to_string()));
            }
        }

        let lock_time = get_u32_le(buf)?;

        if buf.has_remaining() {
            return Err(ConsensusError::Decode(format!(
                "{} trailing bytes after transaction",
                buf.remaining()
            )));
        }

        Ok(Self::new(version, inputs, outputs, lock_time))
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.wtxid == other.wtxid
    }
}

impl Eq for Transaction {}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("txid", &self.txid)
            .field("wtxid", &self.wtxid)
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .field("vsize", &self.vsize())
            .finish()
    }
}

fn put_compact_size(buf: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => buf.put_u8(n as u8),
        0xfd..=0xffff => {
            buf.put_u8(0xfd);
            buf.put_u16_le(n as u16);
        }
        0x1_0000..=0xffff_ffff => {
            buf.put_u8(0xfe);
            buf.put_u32_le(n as u32);
        }
        _ => {
            buf.put_u8(0xff);
            buf.put_u64_le(n);
        }
    }
}

fn put_var_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    put_compact_size(buf, data.len() as u64);
    buf.put_slice(data);
}

fn ensure(buf: &&[u8], needed: usize) -> ConsensusResult<()> {
    if buf.remaining() < needed {
        return Err(ConsensusError::Decode(format!(
            "Unexpected end of data: need {} bytes, have {}",
            needed,
            buf.remaining()
        )));
    }
    Ok(())
}

fn get_u32_le(buf: &mut &[u8]) -> ConsensusResult<u32> {
    ensure(buf, 4)?;
    Ok(buf.get_u32_le())
}

fn get_i32_le(buf: &mut &[u8]) -> ConsensusResult<i32> {
    ensure(buf, 4)?;
    Ok(buf.get_i32_le())
}

fn get_u64_le(buf: &mut &[u8]) -> ConsensusResult<u64> {
    ensure(buf, 8)?;
    Ok(buf.get_u64_le())
}

fn get_hash(buf: &mut &[u8]) -> ConsensusResult<[u8; HASH_LENGTH]> {
    ensure(buf, HASH_LENGTH)?;
    let mut hash = [0u8; HASH_LENGTH];
    buf.copy_to_slice(&mut hash);
    Ok(hash)
}

fn get_compact_size(buf: &mut &[u8]) -> ConsensusResult<u64> {
    ensure(buf, 1)?;
    let n = match buf.get_u8() {
        0xfd => {
            ensure(buf, 2)?;
            buf.get_u16_le() as u64
        }
        0xfe => {
            ensure(buf, 4)?;
            buf.get_u32_le() as u64
        }
        0xff => {
            ensure(buf, 8)?;
            buf.get_u64_le()
        }
        n => n as u64,
    };
    Ok(n)
}

fn get_var_bytes(buf: &mut &[u8]) -> ConsensusResult<Vec<u8>> {
    let len = get_compact_size(buf)? as usize;
    ensure(buf, len)?;
    let mut data = vec![0u8; len];
    buf.copy_to_slice(&mut data);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spend(seed: u8, witness: bool) -> Transaction {
        let mut input = TxIn::new(OutPoint::new(Txid::from_bytes([seed; HASH_LENGTH]), 0));
        input.script_sig = vec![0x51; 20];
        if witness {
            input.witness = vec![vec![0xaa; 72], vec![0xbb; 33]];
        }
        Transaction::new(2, vec![input], vec![TxOut::new(5_000, vec![0x76; 25])], 0)
    }

    #[test]
    fn test_txid_ignores_witness() {
        let legacy = spend(1, false);
        let segwit = spend(1, true);

        assert_eq!(legacy.txid(), segwit.txid());
        assert_ne!(legacy.wtxid(), segwit.wtxid());
    }

    #[test]
    fn test_wtxid_equals_txid_hash_without_witness() {
        let tx = spend(2, false);
        assert_eq!(tx.txid().as_bytes(), tx.wtxid().as_bytes());
        assert_eq!(tx.base_size(), tx.total_size());
        assert_eq!(tx.vsize(), tx.base_size());
    }

    #[test]
    fn test_witness_bytes_are_discounted() {
        let tx = spend(3, true);
        let witness_bytes = tx.total_size() - tx.base_size();

        assert_eq!(tx.weight(), tx.base_size() * 4 + witness_bytes);
        assert!(tx.vsize() < tx.total_size());
        assert!(tx.vsize() > tx.base_size());
    }

    #[test]
    fn test_decode_restores_identities() {
        let tx = spend(4, true);
        let decoded = Transaction::decode(&tx.encode()).unwrap();

        assert_eq!(decoded.txid(), tx.txid());
        assert_eq!(decoded.wtxid(), tx.wtxid());
        assert_eq!(decoded.inputs()[0].witness.len(), 2);
    }

    #[test]
    fn test_decode_zero_inputs_one_output() {
        // Serializes as version|00|01|..., the same prefix as a witness marker
        let tx = Transaction::new(2, vec![], vec![TxOut::new(5, vec![0x51])], 0);
        let bytes = tx.encode();
        assert_eq!(&bytes[4..6], &[0x00, 0x01]);

        let decoded = Transaction::decode(&bytes).unwrap();

        assert_eq!(decoded.txid(), tx.txid());
        assert!(decoded.inputs().is_empty());
        assert_eq!(decoded.outputs()[0].value, 5);
    }

    #[test]
    fn test_decode_rejects_empty_witness_record() {
        let mut bytes = spend(8, false).encode();
        // Marker and flag, then one empty witness stack before the lock time
        bytes.splice(4..4, [0x00, 0x01]);
        let lock_time_at = bytes.len() - 4;
        bytes.insert(lock_time_at, 0x00);

        assert!(matches!(
            Transaction::decode(&bytes),
            Err(ConsensusError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_data() {
        let bytes = spend(5, false).encode();
        let result = Transaction::decode(&bytes[..bytes.len() - 1]);
        assert!(matches!(result, Err(ConsensusError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut bytes = spend(6, false).encode();
        bytes.push(0);
        assert!(matches!(
            Transaction::decode(&bytes),
            Err(ConsensusError::Decode(_))
        ));
    }

    #[test]
    fn test_coinbase_detection() {
        let coinbase = Transaction::new(
            2,
            vec![TxIn::new(OutPoint::null())],
            vec![TxOut::new(50, vec![0x51])],
            0,
        );
        assert!(coinbase.is_coinbase());
        assert!(!spend(7, false).is_coinbase());
    }

    #[test]
    fn test_outpoints_enumerate_outputs() {
        let tx = Transaction::new(
            2,
            vec![TxIn::new(OutPoint::new(Txid::from_bytes([9; 32]), 1))],
            vec![TxOut::new(1, vec![]), TxOut::new(2, vec![])],
            0,
        );
        let points: Vec<_> = tx.outpoints().map(|(p, o)| (p.vout, o.value)).collect();
        assert_eq!(points, vec![(0, 1), (1, 2)]);
        assert_eq!(tx.value_out(), Some(3));
    }
}
