//! Integration tests for the CSR → CSC transpose.
//!
//! Exercises both conversion modes, the degenerate fast paths, the error
//! surface, and agreement with a host-side reference transpose. All tests
//! skip when no WebGPU adapter is available.

use sparsefmt::convert::{self, Action, CsrInput, CscOutput, IndexBase};
use sparsefmt::{DType, Error, IndexType, Result, SparseContext};

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

fn upload(ctx: &SparseContext, label: &str, data: &[u32]) -> wgpu::Buffer {
    let buffer = ctx.create_storage_buffer(label, (4 * data.len()) as u64);
    ctx.write_buffer(&buffer, data);
    buffer
}

/// Run a full conversion from host data and read the CSC result back.
/// `values` carries raw 32-bit words; `None` runs symbolic mode.
fn run_transpose(
    ctx: &SparseContext,
    m: i64,
    n: i64,
    base: IndexBase,
    row_offsets: &[u32],
    col_indices: &[u32],
    values: Option<(&[u32], DType)>,
) -> Result<(Vec<u32>, Vec<u32>, Option<Vec<u32>>)> {
    let nnz = col_indices.len() as i64;
    let action = if values.is_some() {
        Action::Numeric
    } else {
        Action::Symbolic
    };

    let csr_row_offsets = upload(ctx, "csr_row_offsets", row_offsets);
    let csr_col_indices = upload(ctx, "csr_col_indices", col_indices);
    let csr_values = values.map(|(words, _)| upload(ctx, "csr_values", words));

    let csc_col_offsets = ctx.create_storage_buffer("csc_col_offsets", 4 * (n as u64 + 1));
    let csc_row_indices = ctx.create_storage_buffer("csc_row_indices", 4 * nnz.max(1) as u64);
    let csc_values = values
        .map(|(words, _)| ctx.create_storage_buffer("csc_values", 4 * words.len().max(1) as u64));

    let value_type = values.map(|(_, dtype)| dtype).unwrap_or(DType::F32);

    let bytes = convert::csr2csc_buffer_size(
        m,
        n,
        nnz,
        Some(&csr_row_offsets),
        Some(&csr_col_indices),
        action,
        IndexType::I32,
        IndexType::I32,
    )?;
    let scratch = (bytes > 0).then(|| ctx.create_storage_buffer("scratch", bytes));

    convert::csr2csc(
        ctx,
        m,
        n,
        nnz,
        CsrInput {
            row_offsets: Some(&csr_row_offsets),
            col_indices: Some(&csr_col_indices),
            values: csr_values.as_ref(),
        },
        CscOutput {
            col_offsets: Some(&csc_col_offsets),
            row_indices: Some(&csc_row_indices),
            values: csc_values.as_ref(),
        },
        value_type,
        action,
        base,
        IndexType::I32,
        IndexType::I32,
        scratch.as_ref(),
    )?;
    ctx.synchronize()?;

    let offsets = ctx.read_buffer::<u32>(&csc_col_offsets, n as usize + 1)?;
    let rows = ctx.read_buffer::<u32>(&csc_row_indices, nnz as usize)?;
    let out_values = match &csc_values {
        Some(buffer) => Some(ctx.read_buffer::<u32>(buffer, values.map_or(0, |(w, _)| w.len()))?),
        None => None,
    };
    Ok((offsets, rows, out_values))
}

/// Host-side stable transpose, the oracle for structural agreement.
fn reference_transpose(
    n: usize,
    base: u32,
    row_offsets: &[u32],
    col_indices: &[u32],
    values: &[u32],
    words_per_elem: usize,
) -> (Vec<u32>, Vec<u32>, Vec<u32>) {
    let nnz = col_indices.len();
    let mut counts = vec![0u32; n + 1];
    for &c in col_indices {
        counts[(c - base) as usize + 1] += 1;
    }
    for c in 0..n {
        counts[c + 1] += counts[c];
    }
    let offsets: Vec<u32> = counts.iter().map(|&c| c + base).collect();

    let mut next = counts.clone();
    let mut rows = vec![0u32; nnz];
    let mut out_values = vec![0u32; nnz * words_per_elem];
    for r in 0..row_offsets.len() - 1 {
        let start = (row_offsets[r] - base) as usize;
        let end = (row_offsets[r + 1] - base) as usize;
        for k in start..end {
            let c = (col_indices[k] - base) as usize;
            let dst = next[c] as usize;
            next[c] += 1;
            rows[dst] = r as u32 + base;
            out_values[dst * words_per_elem..(dst + 1) * words_per_elem]
                .copy_from_slice(&values[k * words_per_elem..(k + 1) * words_per_elem]);
        }
    }
    (offsets, rows, out_values)
}

/// Deterministic pseudo-random CSR matrix, roughly `fill` nonzeros per row.
fn random_csr(m: usize, n: usize, fill: usize, seed: u64) -> (Vec<u32>, Vec<u32>, Vec<u32>) {
    let mut state = seed | 1;
    let mut rand = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (state >> 33) as u32
    };

    let mut row_offsets = vec![0u32];
    let mut col_indices = Vec::new();
    let mut values = Vec::new();
    for _ in 0..m {
        let in_row = rand() as usize % (2 * fill + 1);
        let mut cols: Vec<u32> = (0..in_row).map(|_| rand() % n as u32).collect();
        cols.sort_unstable();
        cols.dedup();
        for c in cols {
            col_indices.push(c);
            values.push(rand());
        }
        row_offsets.push(col_indices.len() as u32);
    }
    (row_offsets, col_indices, values)
}

#[test]
fn numeric_small_f32() -> Result<()> {
    let Some(ctx) = context() else { return Ok(()) };

    // [7, 0, 5]
    // [0, 9, 0]
    let values: Vec<u32> = [5.0f32, 7.0, 9.0].iter().map(|v| v.to_bits()).collect();
    let (offsets, rows, out) = run_transpose(
        &ctx,
        2,
        3,
        IndexBase::Zero,
        &[0, 2, 3],
        &[2, 0, 1],
        Some((&values, DType::F32)),
    )?;

    assert_eq!(offsets, vec![0, 1, 2, 3]);
    assert_eq!(rows, vec![0, 1, 0]);
    let expected: Vec<u32> = [7.0f32, 9.0, 5.0].iter().map(|v| v.to_bits()).collect();
    assert_eq!(out.unwrap(), expected);
    Ok(())
}

#[test]
fn numeric_small_one_based() -> Result<()> {
    let Some(ctx) = context() else { return Ok(()) };

    let values: Vec<u32> = [5.0f32, 7.0, 9.0].iter().map(|v| v.to_bits()).collect();
    let (offsets, rows, out) = run_transpose(
        &ctx,
        2,
        3,
        IndexBase::One,
        &[1, 3, 4],
        &[3, 1, 2],
        Some((&values, DType::F32)),
    )?;

    assert_eq!(offsets, vec![1, 2, 3, 4]);
    assert_eq!(rows, vec![1, 2, 1]);
    let expected: Vec<u32> = [7.0f32, 9.0, 5.0].iter().map(|v| v.to_bits()).collect();
    assert_eq!(out.unwrap(), expected);
    Ok(())
}

#[test]
fn symbolic_small() -> Result<()> {
    let Some(ctx) = context() else { return Ok(()) };

    let (offsets, rows, out) =
        run_transpose(&ctx, 2, 3, IndexBase::Zero, &[0, 2, 3], &[2, 0, 1], None)?;
    assert_eq!(offsets, vec![0, 1, 2, 3]);
    assert_eq!(rows, vec![0, 1, 0]);
    assert!(out.is_none());
    Ok(())
}

#[test]
fn symbolic_with_odd_sort_pass_count() -> Result<()> {
    let Some(ctx) = context() else { return Ok(()) };

    // n = 2 sorts a single key bit, an odd pass count, so the sorted row
    // indices finish on the scratch side and are copied out to the caller's
    // buffer. Pins the copy-out path and the scratch usage it relies on.
    let (offsets, rows, _) = run_transpose(
        &ctx,
        3,
        2,
        IndexBase::Zero,
        &[0, 2, 3, 4],
        &[1, 0, 0, 1],
        None,
    )?;
    assert_eq!(offsets, vec![0, 2, 4]);
    assert_eq!(rows, vec![0, 1, 0, 2]);
    Ok(())
}

#[test]
fn rows_within_column_keep_source_order() -> Result<()> {
    let Some(ctx) = context() else { return Ok(()) };

    // Every row hits both columns, so each output column collects all rows.
    // Stability requires them in ascending row order with matching values.
    let m = 7usize;
    let mut row_offsets = vec![0u32];
    let mut col_indices = Vec::new();
    let mut values = Vec::new();
    for r in 0..m {
        col_indices.extend_from_slice(&[0, 1]);
        values.extend_from_slice(&[(100 + r) as u32, (200 + r) as u32]);
        row_offsets.push(col_indices.len() as u32);
    }

    let (offsets, rows, out) = run_transpose(
        &ctx,
        m as i64,
        2,
        IndexBase::Zero,
        &row_offsets,
        &col_indices,
        Some((&values, DType::I32)),
    )?;
    let out = out.unwrap();

    assert_eq!(offsets, vec![0, m as u32, 2 * m as u32]);
    for r in 0..m {
        assert_eq!(rows[r], r as u32);
        assert_eq!(rows[m + r], r as u32);
        assert_eq!(out[r], (100 + r) as u32);
        assert_eq!(out[m + r], (200 + r) as u32);
    }
    Ok(())
}

#[test]
fn matches_reference_on_random_matrix() -> Result<()> {
    let Some(ctx) = context() else { return Ok(()) };

    let (m, n) = (157usize, 211usize);
    let (row_offsets, col_indices, values) = random_csr(m, n, 6, 0x5eed);
    let (want_offsets, want_rows, want_values) =
        reference_transpose(n, 0, &row_offsets, &col_indices, &values, 1);

    let (offsets, rows, out) = run_transpose(
        &ctx,
        m as i64,
        n as i64,
        IndexBase::Zero,
        &row_offsets,
        &col_indices,
        Some((&values, DType::I32)),
    )?;

    assert_eq!(offsets, want_offsets);
    assert_eq!(rows, want_rows);
    assert_eq!(out.unwrap(), want_values);
    Ok(())
}

#[test]
fn symbolic_matches_numeric_structure() -> Result<()> {
    let Some(ctx) = context() else { return Ok(()) };

    let (m, n) = (64usize, 48usize);
    let (row_offsets, col_indices, values) = random_csr(m, n, 4, 42);

    let (num_offsets, num_rows, _) = run_transpose(
        &ctx,
        m as i64,
        n as i64,
        IndexBase::Zero,
        &row_offsets,
        &col_indices,
        Some((&values, DType::I32)),
    )?;
    let (sym_offsets, sym_rows, _) = run_transpose(
        &ctx,
        m as i64,
        n as i64,
        IndexBase::Zero,
        &row_offsets,
        &col_indices,
        None,
    )?;

    assert_eq!(num_offsets, sym_offsets);
    assert_eq!(num_rows, sym_rows);
    Ok(())
}

#[test]
fn f64_values_move_bit_exact() -> Result<()> {
    let Some(ctx) = context() else { return Ok(()) };

    // Values chosen so any f32 round-trip or arithmetic would change bits.
    let values_f64 = [1.0000000000000002f64, -0.0, f64::MIN_POSITIVE, 1e300];
    let value_words: Vec<u32> = bytemuck::cast_slice(&values_f64).to_vec();

    let (offsets, rows, out) = run_transpose(
        &ctx,
        2,
        2,
        IndexBase::Zero,
        &[0, 2, 4],
        &[0, 1, 0, 1],
        Some((&value_words, DType::F64)),
    )?;
    let out = out.unwrap();

    assert_eq!(offsets, vec![0, 2, 4]);
    assert_eq!(rows, vec![0, 1, 0, 1]);
    let out_f64: &[f64] = bytemuck::cast_slice(&out);
    assert_eq!(out_f64[0].to_bits(), values_f64[0].to_bits());
    assert_eq!(out_f64[1].to_bits(), values_f64[2].to_bits());
    assert_eq!(out_f64[2].to_bits(), values_f64[1].to_bits());
    assert_eq!(out_f64[3].to_bits(), values_f64[3].to_bits());
    Ok(())
}

#[test]
fn transpose_twice_round_trips() -> Result<()> {
    let Some(ctx) = context() else { return Ok(()) };

    let (m, n) = (40usize, 33usize);
    let (row_offsets, col_indices, values) = random_csr(m, n, 3, 7);

    let (csc_offsets, csc_rows, csc_values) = run_transpose(
        &ctx,
        m as i64,
        n as i64,
        IndexBase::Zero,
        &row_offsets,
        &col_indices,
        Some((&values, DType::I32)),
    )?;
    let csc_values = csc_values.unwrap();

    // The CSC arrays are the CSR form of the n x m transpose; converting
    // again yields the original matrix.
    let (back_offsets, back_cols, back_values) = run_transpose(
        &ctx,
        n as i64,
        m as i64,
        IndexBase::Zero,
        &csc_offsets,
        &csc_rows,
        Some((&csc_values, DType::I32)),
    )?;

    assert_eq!(back_offsets, row_offsets);
    assert_eq!(back_cols, col_indices);
    assert_eq!(back_values.unwrap(), values);
    Ok(())
}

#[test]
fn empty_nnz_writes_base_offsets() -> Result<()> {
    let Some(ctx) = context() else { return Ok(()) };

    for base in [IndexBase::Zero, IndexBase::One] {
        let row_offsets = vec![base.offset(); 5];
        let (offsets, rows, _) = run_transpose(&ctx, 4, 5, base, &row_offsets, &[], None)?;
        assert_eq!(offsets, vec![base.offset(); 6]);
        assert!(rows.is_empty());
    }

    // Column indices stay optional while nnz == 0; row offsets do not.
    let row_offsets = upload(&ctx, "ro", &[0; 5]);
    let size = convert::csr2csc_buffer_size(
        4,
        5,
        0,
        Some(&row_offsets),
        None,
        Action::Symbolic,
        IndexType::I32,
        IndexType::I32,
    )?;
    assert_eq!(size, 0);
    Ok(())
}

#[test]
fn empty_dimensions_succeed_without_buffers() -> Result<()> {
    let Some(ctx) = context() else { return Ok(()) };

    for (m, n) in [(0, 5), (5, 0), (0, 0)] {
        convert::csr2csc(
            &ctx,
            m,
            n,
            0,
            CsrInput::default(),
            CscOutput::default(),
            DType::F32,
            Action::Numeric,
            IndexBase::Zero,
            IndexType::I32,
            IndexType::I32,
            None,
        )?;
    }
    Ok(())
}

#[test]
fn missing_scratch_is_rejected() -> Result<()> {
    let Some(ctx) = context() else { return Ok(()) };

    let row_offsets = upload(&ctx, "ro", &[0, 1]);
    let col_indices = upload(&ctx, "ci", &[0]);
    let col_offsets = ctx.create_storage_buffer("co", 8);
    let row_indices = ctx.create_storage_buffer("ri", 4);

    let err = convert::csr2csc(
        &ctx,
        1,
        1,
        1,
        CsrInput {
            row_offsets: Some(&row_offsets),
            col_indices: Some(&col_indices),
            values: None,
        },
        CscOutput {
            col_offsets: Some(&col_offsets),
            row_indices: Some(&row_indices),
            values: None,
        },
        DType::F32,
        Action::Symbolic,
        IndexBase::Zero,
        IndexType::I32,
        IndexType::I32,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidPointer { name: "scratch" }));
    Ok(())
}

#[test]
fn undersized_scratch_is_rejected() -> Result<()> {
    let Some(ctx) = context() else { return Ok(()) };

    let (m, n, nnz) = (2i64, 3i64, 3i64);
    let row_offsets = upload(&ctx, "ro", &[0, 2, 3]);
    let col_indices = upload(&ctx, "ci", &[2, 0, 1]);
    let col_offsets = ctx.create_storage_buffer("co", 16);
    let row_indices = ctx.create_storage_buffer("ri", 12);

    let needed = convert::csr2csc_buffer_size(
        m,
        n,
        nnz,
        Some(&row_offsets),
        Some(&col_indices),
        Action::Symbolic,
        IndexType::I32,
        IndexType::I32,
    )?;
    let scratch = ctx.create_storage_buffer("scratch", needed - 256);

    let err = convert::csr2csc(
        &ctx,
        m,
        n,
        nnz,
        CsrInput {
            row_offsets: Some(&row_offsets),
            col_indices: Some(&col_indices),
            values: None,
        },
        CscOutput {
            col_offsets: Some(&col_offsets),
            row_indices: Some(&row_indices),
            values: None,
        },
        DType::F32,
        Action::Symbolic,
        IndexBase::Zero,
        IndexType::I32,
        IndexType::I32,
        Some(&scratch),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::ScratchTooSmall { required, provided }
            if required == needed && provided == needed - 256
    ));
    Ok(())
}

#[test]
fn unsupported_types_are_rejected() -> Result<()> {
    let Some(ctx) = context() else { return Ok(()) };

    let row_offsets = upload(&ctx, "ro", &[0, 1]);
    let col_indices = upload(&ctx, "ci", &[0]);
    let values = upload(&ctx, "va", &[1]);
    let col_offsets = ctx.create_storage_buffer("co", 8);
    let row_indices = ctx.create_storage_buffer("ri", 4);
    let out_values = ctx.create_storage_buffer("vo", 4);
    let scratch = ctx.create_storage_buffer("scratch", 4096);

    let csr = CsrInput {
        row_offsets: Some(&row_offsets),
        col_indices: Some(&col_indices),
        values: Some(&values),
    };
    let csc = CscOutput {
        col_offsets: Some(&col_offsets),
        row_indices: Some(&row_indices),
        values: Some(&out_values),
    };

    // i8 values have no word-wise gather.
    let err = convert::csr2csc(
        &ctx,
        1,
        1,
        1,
        csr,
        csc,
        DType::I8,
        Action::Numeric,
        IndexBase::Zero,
        IndexType::I32,
        IndexType::I32,
        Some(&scratch),
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnsupportedDType { dtype: DType::I8, .. }));

    // 64-bit indices have no kernels on this backend.
    let err = convert::csr2csc(
        &ctx,
        1,
        1,
        1,
        csr,
        csc,
        DType::F32,
        Action::Numeric,
        IndexBase::Zero,
        IndexType::I64,
        IndexType::I32,
        Some(&scratch),
    )
    .unwrap_err();
    assert!(matches!(err, Error::NotImplemented { .. }));
    Ok(())
}

#[test]
fn reported_buffer_size_is_sufficient_across_shapes() -> Result<()> {
    let Some(ctx) = context() else { return Ok(()) };

    // Shapes straddling the sort block size and the region alignment.
    for (m, n) in [(1usize, 1usize), (3, 255), (16, 256), (5, 257), (300, 40)] {
        let (row_offsets, col_indices, values) = random_csr(m, n, 3, (m * n) as u64);
        let (want_offsets, want_rows, want_values) =
            reference_transpose(n, 0, &row_offsets, &col_indices, &values, 1);

        let (offsets, rows, out) = run_transpose(
            &ctx,
            m as i64,
            n as i64,
            IndexBase::Zero,
            &row_offsets,
            &col_indices,
            Some((&values, DType::I32)),
        )?;
        assert_eq!(offsets, want_offsets, "offsets mismatch at {m}x{n}");
        assert_eq!(rows, want_rows, "rows mismatch at {m}x{n}");
        assert_eq!(out.unwrap(), want_values, "values mismatch at {m}x{n}");
    }
    Ok(())
}
