use std::mem;

use crate::op::{OpKind, Operation};

/// Compute a minimal edit script between `old` and `new`.
///
/// The alignment is a Myers shortest-edit-script (LCS) walk:
/// 1. Trim the common prefix and suffix (the overwhelmingly common case for
///    editor writes is a small change in a large buffer)
/// 2. Run the O(ND) greedy search over the middle
/// 3. Walk the alignment left to right, skipping Common runs, and coalesce
///    consecutive same-kind elements into one Operation each
///
/// Operation offsets are positions in the evolving buffer: applying the
/// returned operations to `old` in emission order reproduces `new` exactly.
/// Ties in the alignment are broken deterministically, so identical inputs
/// always produce identical scripts. `diff(x, x)` is empty.
///
/// `base_hash` is left at zero; callers tag operations at submission time.
pub fn diff(old: &[u8], new: &[u8]) -> Vec<Operation> {
    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut suffix = 0;
    while suffix < old.len() - prefix
        && suffix < new.len() - prefix
        && old[old.len() - 1 - suffix] == new[new.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let mid_old = &old[prefix..old.len() - suffix];
    let mid_new = &new[prefix..new.len() - suffix];

    let script = edit_script(mid_old, mid_new);
    coalesce(mid_old, mid_new, &script, prefix as u64)
}

/// Myers greedy shortest-edit-script search with full trace backtracking.
/// Returns one tag per alignment element: Common consumes a byte from both
/// sides, Append from `new`, Delete from `old`.
fn edit_script(old: &[u8], new: &[u8]) -> Vec<OpKind> {
    let n = old.len() as isize;
    let m = new.len() as isize;
    if n == 0 {
        return vec![OpKind::Append; m as usize];
    }
    if m == 0 {
        return vec![OpKind::Delete; n as usize];
    }

    let max = n + m;
    let idx = |k: isize| (k + max) as usize;
    let mut v = vec![0isize; (2 * max + 1) as usize];
    let mut trace: Vec<Vec<isize>> = Vec::new();
    let mut d_final = 0;

    'search: for d in 0..=max {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let down = k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]);
            let mut x = if down { v[idx(k + 1)] } else { v[idx(k - 1)] + 1 };
            let mut y = x - k;
            while x < n && y < m && old[x as usize] == new[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx(k)] = x;
            if x >= n && y >= m {
                d_final = d;
                break 'search;
            }
            k += 2;
        }
    }

    // Walk the trace backward from (n, m), mirroring the forward move rule,
    // then reverse into left-to-right order.
    let mut script = Vec::new();
    let mut x = n;
    let mut y = m;
    for d in (1..=d_final).rev() {
        let v = &trace[d as usize];
        let k = x - y;
        let down = k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]);
        let prev_k = if down { k + 1 } else { k - 1 };
        let prev_x = v[idx(prev_k)];
        let prev_y = prev_x - prev_k;

        let mid_x = if down { prev_x } else { prev_x + 1 };
        while x > mid_x {
            script.push(OpKind::Common);
            x -= 1;
            y -= 1;
        }
        script.push(if down { OpKind::Append } else { OpKind::Delete });
        x = prev_x;
        y = prev_y;
    }
    while x > 0 {
        script.push(OpKind::Common);
        x -= 1;
    }
    script.reverse();
    script
}

/// Coalesce consecutive same-kind alignment elements into Operations.
/// `base` is the offset of the trimmed middle within the full buffer.
fn coalesce(old: &[u8], new: &[u8], script: &[OpKind], base: u64) -> Vec<Operation> {
    let mut ops = Vec::new();
    let mut i = 0; // old cursor
    let mut j = 0; // new cursor
    let mut run: Option<(OpKind, u64)> = None;
    let mut agg: Vec<u8> = Vec::new();

    for &tag in script {
        if run.map_or(true, |(kind, _)| kind != tag) {
            if let Some((kind, offset)) = run.take() {
                if !agg.is_empty() {
                    ops.push(make_op(kind, offset, mem::take(&mut agg)));
                }
            }
            run = Some((tag, base + j as u64));
        }
        match tag {
            OpKind::Common => {
                i += 1;
                j += 1;
            }
            OpKind::Append => {
                agg.push(new[j]);
                j += 1;
            }
            OpKind::Delete => {
                agg.push(old[i]);
                i += 1;
            }
            OpKind::Replace => unreachable!("edit scripts contain no Replace elements"),
        }
    }
    if let Some((kind, offset)) = run {
        if !agg.is_empty() {
            ops.push(make_op(kind, offset, agg));
        }
    }
    ops
}

fn make_op(kind: OpKind, offset: u64, data: Vec<u8>) -> Operation {
    match kind {
        OpKind::Append => Operation::append(offset, data),
        OpKind::Delete => Operation::delete(offset, data),
        _ => unreachable!("only Append and Delete runs aggregate data"),
    }
}
