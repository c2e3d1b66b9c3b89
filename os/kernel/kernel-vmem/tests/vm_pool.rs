//! Region bookkeeping: the self-hosted directory page, rounding, reuse,
//! compaction, and the window bounds.

mod common;

use common::{Boot, boot};
use kernel_memory_addresses::{PAGE_SIZE, VirtualAddress};
use kernel_vmem::VmPool;

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
fn directory_page_is_region_zero() {
    let mut b = boot();
    let pool = make_pool(&mut b);

    assert_eq!(pool.region_count(), 1);
    assert_eq!(pool.available(), (POOL_PAGES - 1) * PAGE_SIZE);

    let region0 = pool.region(&mut b.vmm, &mut b.frames, &mut b.machine, 0);
    assert_eq!(region0.base, VirtualAddress::new(POOL_BASE));
    assert_eq!(region0.length, PAGE_SIZE);
}

#[test]
fn allocations_round_up_and_append_contiguously() {
    let mut b = boot();
    let mut pool = make_pool(&mut b);

    let a = pool.allocate(&mut b.vmm, &mut b.frames, &mut b.machine, 100);
    assert_eq!(a, VirtualAddress::new(POOL_BASE + PAGE_SIZE));
    assert_eq!(pool.available(), (POOL_PAGES - 2) * PAGE_SIZE);

    let c = pool.allocate(&mut b.vmm, &mut b.frames, &mut b.machine, 2 * PAGE_SIZE);
    assert_eq!(c, a + PAGE_SIZE);
    assert_eq!(pool.available(), (POOL_PAGES - 4) * PAGE_SIZE);
    assert_eq!(pool.region_count(), 3);
}

#[test]
fn released_space_is_reused_and_the_directory_compacts() {
    let mut b = boot();
    let mut pool = make_pool(&mut b);

    let a = pool.allocate(&mut b.vmm, &mut b.frames, &mut b.machine, PAGE_SIZE);
    let m = pool.allocate(&mut b.vmm, &mut b.frames, &mut b.machine, 2 * PAGE_SIZE);
    let c = pool.allocate(&mut b.vmm, &mut b.frames, &mut b.machine, PAGE_SIZE);
    assert_eq!(pool.region_count(), 4);

    pool.release(&mut b.vmm, &mut b.frames, &mut b.machine, m);
    assert_eq!(pool.region_count(), 3);

    // The freed gap is the first fit for an equal-sized request.
    let d = pool.allocate(&mut b.vmm, &mut b.frames, &mut b.machine, 2 * PAGE_SIZE);
    assert_eq!(d, m);

    // Directory stays gap-free and address-ordered: R0, a, d, c.
    let bases: Vec<VirtualAddress> = (0..pool.region_count())
        .map(|slot| pool.region(&mut b.vmm, &mut b.frames, &mut b.machine, slot).base)
        .collect();
    assert_eq!(bases, vec![VirtualAddress::new(POOL_BASE), a, d, c]);
}

#[test]
fn release_returns_touched_frames_only() {
    let mut b = boot();
    let mut pool = make_pool(&mut b);

    let region = pool.allocate(&mut b.vmm, &mut b.frames, &mut b.machine, 3 * PAGE_SIZE);
    // Touch two of the three pages; the third never materialises.
    b.machine.poke(&mut b.vmm, &mut b.frames, region, 1);
    b.machine
        .poke(&mut b.vmm, &mut b.frames, region + PAGE_SIZE, 2);

    let free_before = b.frames.pool(b.process_pool).free_frames();
    let available_before = pool.available();
    pool.release(&mut b.vmm, &mut b.frames, &mut b.machine, region);

    assert_eq!(
        b.frames.pool(b.process_pool).free_frames(),
        free_before + 2
    );
    assert_eq!(pool.available(), available_before + 3 * PAGE_SIZE);
}

#[test]
#[should_panic(expected = "no region starts at")]
fn release_requires_an_exact_region_base() {
    let mut b = boot();
    let mut pool = make_pool(&mut b);

    let region = pool.allocate(&mut b.vmm, &mut b.frames, &mut b.machine, 2 * PAGE_SIZE);
    pool.release(&mut b.vmm, &mut b.frames, &mut b.machine, region + PAGE_SIZE);
}

#[test]
#[should_panic(expected = "pool exhausted")]
fn allocation_beyond_available_space_is_fatal() {
    let mut b = boot();
    let mut pool = make_pool(&mut b);

    pool.allocate(
        &mut b.vmm,
        &mut b.frames,
        &mut b.machine,
        POOL_PAGES * PAGE_SIZE,
    );
}

#[test]
#[should_panic(expected = "zero-length region request")]
fn zero_sized_allocation_is_fatal() {
    let mut b = boot();
    let mut pool = make_pool(&mut b);

    pool.allocate(&mut b.vmm, &mut b.frames, &mut b.machine, 0);
}

#[test]
fn legitimacy_uses_an_exclusive_upper_bound() {
    let mut b = boot();
    let pool = make_pool(&mut b);
    let size = POOL_PAGES * PAGE_SIZE;

    assert!(pool.is_legitimate(VirtualAddress::new(POOL_BASE)));
    assert!(pool.is_legitimate(VirtualAddress::new(POOL_BASE + size - 1)));
    assert!(!pool.is_legitimate(VirtualAddress::new(POOL_BASE + size)));
    assert!(!pool.is_legitimate(VirtualAddress::new(POOL_BASE - 1)));
}
