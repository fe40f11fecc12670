//! Handle and buffer bookkeeping returns to its baseline after every
//! kind of execution.
//!
//! Kept as the only test in this binary: it reads process-wide counters.

mod common;

use evmlink_bridge::{memory, registry, Revision, StatusCode};
use evmlink_hostapi::{Account, MemHost};

use common::*;

#[test]
fn test_no_leaked_handles_or_buffers() {
    let vm = example_vm();
    let handles = registry::global().live_count();
    let buffers = memory::outstanding_count();
    let assert_balanced = |stage: &str| {
        assert_eq!(registry::global().live_count(), handles, "handles after {stage}");
        assert_eq!(memory::outstanding_count(), buffers, "buffers after {stage}");
    };

    // Simple execution.
    let mut host = test_host();
    let result = vm.execute(&mut host, Revision::Shanghai, &message(NUMBER_CODE, 100));
    assert_eq!(result.status, StatusCode::SUCCESS);
    assert_balanced("simple execution");

    // Failed execution.
    let result = vm.execute(&mut host, Revision::Shanghai, &message(&[0xfe], 100));
    assert_eq!(result.status, StatusCode::UNDEFINED_INSTRUCTION);
    assert_balanced("failed execution");

    // A call whose output travels host -> engine -> host.
    let result = vm.execute(&mut host, Revision::Shanghai, &message(CALL_CODE, 100));
    assert_eq!(&result.output[..], CALL_OUTPUT);
    assert_balanced("outgoing call");

    // Empty host output is never handed out.
    let mut quiet = MemHost::new();
    vm.execute(&mut quiet, Revision::Shanghai, &message(CALL_CODE, 100));
    assert_balanced("call with empty output");

    // Nested executions: one more live handle per level.
    let target = addr(0xaa);
    let code = self_call_code(target);
    let mut nesting = NestingHost::new(&vm, 3);
    nesting.world.insert_account(target, Account::with_code(code.clone()));
    let result = vm.execute(&mut nesting, Revision::Shanghai, &message(&code, 100_000));
    assert_eq!(&result.output[..], CALL_OUTPUT);
    assert_eq!(
        nesting.live_handles,
        vec![handles + 1, handles + 2, handles + 3]
    );
    assert_balanced("nested execution");

    // Concurrent executions.
    std::thread::scope(|scope| {
        for _ in 0..8 {
            let vm = &vm;
            scope.spawn(move || {
                let mut host = test_host();
                for _ in 0..25 {
                    vm.execute(&mut host, Revision::Shanghai, &message(CALL_CODE, 100));
                }
            });
        }
    });
    assert_balanced("concurrent executions");
}
