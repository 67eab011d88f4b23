//! Integration tests for the stable sort-pairs primitive.

use sparsefmt::pipeline::BufRegion;
use sparsefmt::sort::{self, BufferSel, DoubleBuffer};
use sparsefmt::{Result, SparseContext};

fn context() -> Option<SparseContext> {
    let _ = env_logger::builder().is_test(true).try_init();
    match SparseContext::from_default_adapter() {
        Ok(ctx) => Some(ctx),
        Err(_) => {
            eprintln!("skipping: no WebGPU adapter available");
            None
        }
    }
}

fn sort_on_device(ctx: &SparseContext, keys: &[u32], end_bit: u32) -> Result<(Vec<u32>, Vec<u32>)> {
    let n = keys.len() as u64;
    let vals: Vec<u32> = (0..keys.len() as u32).collect();

    let keys_a = ctx.create_storage_buffer("keys_a", 4 * n);
    let keys_b = ctx.create_storage_buffer("keys_b", 4 * n);
    let vals_a = ctx.create_storage_buffer("vals_a", 4 * n);
    let vals_b = ctx.create_storage_buffer("vals_b", 4 * n);
    ctx.write_buffer(&keys_a, keys);
    ctx.write_buffer(&vals_a, &vals);

    let scratch = ctx.create_storage_buffer("scratch", sort::radix_sort_pairs_buffer_size(n));

    let mut key_pair = DoubleBuffer::new(BufRegion::whole(&keys_a), BufRegion::whole(&keys_b));
    let mut val_pair = DoubleBuffer::new(BufRegion::whole(&vals_a), BufRegion::whole(&vals_b));
    sort::radix_sort_pairs(
        ctx,
        &mut key_pair,
        &mut val_pair,
        n,
        0,
        end_bit,
        BufRegion::whole(&scratch),
    )?;
    ctx.synchronize()?;

    // Both pairs flip together, so their selectors agree.
    assert_eq!(key_pair.selector(), val_pair.selector());
    let (keys_out, vals_out) = match key_pair.selector() {
        BufferSel::A => (&keys_a, &vals_a),
        BufferSel::B => (&keys_b, &vals_b),
    };
    Ok((
        ctx.read_buffer(keys_out, keys.len())?,
        ctx.read_buffer(vals_out, keys.len())?,
    ))
}

fn assert_stable_sorted(input_keys: &[u32], sorted_keys: &[u32], perm: &[u32]) {
    for w in sorted_keys.windows(2) {
        assert!(w[0] <= w[1], "keys out of order");
    }
    // perm[i] is the source position; equal keys must keep source order.
    for (i, (&key, &src)) in sorted_keys.iter().zip(perm).enumerate() {
        assert_eq!(input_keys[src as usize], key);
        if i > 0 && sorted_keys[i - 1] == key {
            assert!(perm[i - 1] < src, "equal keys reordered at {i}");
        }
    }
}

#[test]
fn sorts_pairs_with_duplicates() -> Result<()> {
    let Some(ctx) = context() else { return Ok(()) };

    let mut state = 12345u64;
    let keys: Vec<u32> = (0..5000)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            (state >> 33) as u32 % 97
        })
        .collect();

    let (sorted, perm) = sort_on_device(&ctx, &keys, sort::bits_for(96))?;
    assert_stable_sorted(&keys, &sorted, &perm);
    Ok(())
}

#[test]
fn sorts_across_block_boundaries() -> Result<()> {
    let Some(ctx) = context() else { return Ok(()) };

    // Sizes around the 256-lane block size, reversed input.
    for n in [1usize, 255, 256, 257, 1024, 4096] {
        let keys: Vec<u32> = (0..n as u32).rev().collect();
        let (sorted, perm) = sort_on_device(&ctx, &keys, sort::bits_for(n as u32))?;
        let expect: Vec<u32> = (0..n as u32).collect();
        assert_eq!(sorted, expect);
        let expect_perm: Vec<u32> = (0..n as u32).rev().collect();
        assert_eq!(perm, expect_perm);
    }
    Ok(())
}

#[test]
fn all_equal_keys_preserve_order() -> Result<()> {
    let Some(ctx) = context() else { return Ok(()) };

    let keys = vec![7u32; 1000];
    let (sorted, perm) = sort_on_device(&ctx, &keys, sort::bits_for(7))?;
    assert_eq!(sorted, keys);
    let expect: Vec<u32> = (0..1000).collect();
    assert_eq!(perm, expect);
    Ok(())
}
