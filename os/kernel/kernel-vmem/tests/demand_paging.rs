//! Fault-driven mapping: validation, chain building, no-refault, teardown.

mod common;

use common::{Boot, boot};
use kernel_alloc::PhysMapper;
use kernel_memory_addresses::{PAGE_SIZE, VirtualAddress, VirtualPage};
use kernel_vmem::page_table::split_indices;
use kernel_vmem::{FaultDisposition, PageDirectory, PageFaultCode, PageTable, VmPool};

const POOL_BASE: u32 = 0x0400_0000; // 64 MiB
const POOL_PAGES: u32 = 16;

fn make_pool(b: &mut Boot) -> VmPool {
    VmPool::new(
        &mut b.vmm,
        &mut b.frames,
        &mut b.machine,
        VirtualAddress::new(POOL_BASE),
        POOL_PAGES * PAGE_SIZE,
        b.process_pool,
    )
}

#[test]
fn serviced_fault_never_recurs() {
    let mut b = boot();
    let mut pool = make_pool(&mut b);
    let region = pool.allocate(&mut b.vmm, &mut b.frames, &mut b.machine, 3 * PAGE_SIZE);

    let faults_before = b.machine.faults;
    b.machine.poke(&mut b.vmm, &mut b.frames, region, 0x1234_5678);
    assert_eq!(b.machine.faults, faults_before + 1);

    // Subsequent accesses to the same page must not trap again.
    assert_eq!(
        b.machine.peek(&mut b.vmm, &mut b.frames, region),
        0x1234_5678
    );
    b.machine
        .poke(&mut b.vmm, &mut b.frames, region + 4, 0x9ABC_DEF0);
    assert_eq!(b.machine.faults, faults_before + 1);
}

#[test]
fn sibling_page_reuses_the_existing_table() {
    let mut b = boot();
    let mut pool = make_pool(&mut b);
    let region = pool.allocate(&mut b.vmm, &mut b.frames, &mut b.machine, 3 * PAGE_SIZE);
    b.machine.poke(&mut b.vmm, &mut b.frames, region, 1);

    let free_before = b.frames.pool(b.process_pool).free_frames();
    b.machine
        .poke(&mut b.vmm, &mut b.frames, region + PAGE_SIZE, 2);

    // One data frame only; the table for this directory slot already exists.
    assert_eq!(
        b.frames.pool(b.process_pool).free_frames(),
        free_before - 1
    );
}

#[test]
fn first_fault_in_a_window_builds_the_whole_chain() {
    let mut b = boot();
    let free_before = b.frames.pool(b.process_pool).free_frames();

    // Constructing the pool demand-pages its region directory, which is the
    // first touch anywhere under this directory slot: table + page.
    let _pool = make_pool(&mut b);
    assert_eq!(
        b.frames.pool(b.process_pool).free_frames(),
        free_before - 2
    );

    let (dir_slot, _) = split_indices(VirtualAddress::new(POOL_BASE));
    // SAFETY: reading the directory frame through the identity map.
    let directory: &PageDirectory =
        unsafe { b.machine.phys_to_mut(b.space.directory().base()) };
    assert!(directory.get(dir_slot).is_present());
}

#[test]
fn whole_window_is_fair_game_for_the_fault_handler() {
    let mut b = boot();
    let _pool = make_pool(&mut b);

    // The last word inside the window is legitimate even though no region
    // covers it — the handler validates windows, not regions.
    let last = VirtualAddress::new(POOL_BASE + POOL_PAGES * PAGE_SIZE - 4);
    b.machine.poke(&mut b.vmm, &mut b.frames, last, 0xFEED);
    assert_eq!(b.machine.peek(&mut b.vmm, &mut b.frames, last), 0xFEED);
}

#[test]
#[should_panic(expected = "access to unallocated virtual address")]
fn first_byte_past_the_window_is_rejected() {
    let mut b = boot();
    let _pool = make_pool(&mut b);

    let past_end = VirtualAddress::new(POOL_BASE + POOL_PAGES * PAGE_SIZE);
    b.machine.poke(&mut b.vmm, &mut b.frames, past_end, 1);
}

#[test]
#[should_panic(expected = "access to unallocated virtual address")]
fn address_outside_every_window_is_rejected() {
    let mut b = boot();
    let _pool = make_pool(&mut b);

    b.machine
        .poke(&mut b.vmm, &mut b.frames, VirtualAddress::new(0x0800_0000), 1);
}

#[test]
fn without_registered_pools_any_address_is_serviced() {
    let mut b = boot();

    let va = VirtualAddress::new(0x0200_0000);
    b.machine.poke(&mut b.vmm, &mut b.frames, va, 42);
    assert_eq!(b.machine.peek(&mut b.vmm, &mut b.frames, va), 42);
}

#[test]
fn protection_violations_are_left_to_the_dispatcher() {
    let mut b = boot();
    let free_before = b.frames.pool(b.process_pool).free_frames();

    let code = PageFaultCode::new().with_present(true).with_write(true);
    let disposition = b.vmm.handle_fault(&mut b.frames, &mut b.machine, code);

    assert_eq!(disposition, FaultDisposition::ProtectionViolation);
    assert_eq!(b.frames.pool(b.process_pool).free_frames(), free_before);
}

#[test]
fn free_page_releases_the_frame_and_flushes() {
    let mut b = boot();
    let mut pool = make_pool(&mut b);
    let region = pool.allocate(&mut b.vmm, &mut b.frames, &mut b.machine, PAGE_SIZE);
    b.machine.poke(&mut b.vmm, &mut b.frames, region, 7);

    let (dir_slot, table_slot) = split_indices(region);
    // SAFETY: paging structures read through the identity map.
    let directory: &PageDirectory =
        unsafe { b.machine.phys_to_mut(b.space.directory().base()) };
    let (table_frame, _) = directory.get(dir_slot).table().unwrap();
    let table: &PageTable = unsafe { b.machine.phys_to_mut(table_frame.base()) };
    let (backing_frame, _) = table.get(table_slot).page().unwrap();

    let free_before = b.frames.pool(b.process_pool).free_frames();
    let reloads_before = b.machine.cr3_reloads;
    let page = VirtualPage::from_base(region);
    b.vmm.free_page(&mut b.frames, &mut b.machine, page);

    assert_eq!(
        b.frames.pool(b.process_pool).free_frames(),
        free_before + 1
    );
    assert_eq!(b.machine.cr3_reloads, reloads_before + 1);
    assert!(!b.vmm.is_mapped(&mut b.machine, page));

    // Only the present bit changed; the stale frame number stays behind.
    let entry = table.get(table_slot);
    assert!(!entry.is_present());
    assert_eq!(entry.flags().frame(), backing_frame);
}

#[test]
#[should_panic(expected = "is not mapped")]
fn freeing_an_unmapped_page_is_fatal() {
    let mut b = boot();
    let mut pool = make_pool(&mut b);
    let region = pool.allocate(&mut b.vmm, &mut b.frames, &mut b.machine, PAGE_SIZE);
    b.machine.poke(&mut b.vmm, &mut b.frames, region, 7);

    let page = VirtualPage::from_base(region);
    b.vmm.free_page(&mut b.frames, &mut b.machine, page);
    b.vmm.free_page(&mut b.frames, &mut b.machine, page);
}
