//! Fuzz target: `ResourceTransferManager`
//!
//! Interprets the input as a stream of begin/chunk/complete/abort
//! operations and asserts that no write ever lands outside the declared
//! size and that the last sink byte stays zero.
//!
//! cargo fuzz run fuzz_resource_transfer

#![no_main]

use libfuzzer_sys::fuzz_target;
use twinsync::SyncConfig;
use twinsync::adapters::memory::SliceChunkSource;
use twinsync::registry::{FixedBuf, Shared};
use twinsync::twin::ports::NoPublish;
use twinsync::twin::transfer::{
    ResourceDescriptor, ResourceSink, ResourceTransferManager, TransferState,
};

const CAP: usize = 64;

fuzz_target!(|data: &[u8]| {
    let cfg = SyncConfig {
        chunk_budget: 8,
        ..SyncConfig::default()
    };
    let sink = Shared::new(FixedBuf::new(CAP));
    let version = Shared::new(FixedBuf::with_text(8, "0"));
    let mut mgr = ResourceTransferManager::new(&cfg);
    if mgr
        .register(ResourceDescriptor::new(
            1,
            "blob",
            &version,
            ResourceSink::Text(sink.clone()),
        ))
        .is_err()
    {
        return;
    }

    let mut widest = 0usize;
    for op in data.chunks(3) {
        let arg = op.get(1).copied().unwrap_or(0) as usize;
        match op[0] % 4 {
            0 => {
                if mgr.begin_transfer(1, arg).is_ok() {
                    assert!(arg < CAP);
                    widest = widest.max(arg);
                }
            }
            1 => {
                let len = op.get(2).copied().unwrap_or(0) as usize % 16;
                let payload: Vec<u8> = (1..=len as u8).collect();
                let mut src = SliceChunkSource::new(&payload);
                let _ = mgr.accept_chunk(1, arg, &mut src);
            }
            2 => {
                let _ = mgr.complete_transfer(1, arg % 2 == 0, "1", &mut NoPublish);
            }
            _ => mgr.abort(),
        }

        if let TransferState::Transferring(s) = mgr.state() {
            assert!(s.cumulative_offset <= s.declared_size);
        }
        sink.with(|b| {
            let bytes = b.as_bytes();
            assert!(bytes[widest..].iter().all(|&x| x == 0));
            assert_eq!(bytes[CAP - 1], 0);
        });
    }
});
