//! Snapping utilities (eg. snap to a grid).

/// Snaps `pos` to the nearest multiple of `grid`.
pub const fn snap_to_grid(pos: i64, grid: i64) -> i64 {
    assert!(grid > 0);

    let rem = pos.rem_euclid(grid);
    assert!(rem >= 0);
    assert!(rem < grid);
    if rem <= grid / 2 {
        pos - rem
    } else {
        pos + grid - rem
    }
}

/// Snaps `pos` to the nearest multiple of `grid` not greater than `pos`.
pub const fn snap_to_grid_down(pos: i64, grid: i64) -> i64 {
    assert!(grid > 0);
    pos - pos.rem_euclid(grid)
}

/// Snaps `pos` to the nearest multiple of `grid` not less than `pos`.
pub const fn snap_to_grid_up(pos: i64, grid: i64) -> i64 {
    assert!(grid > 0);
    let rem = pos.rem_euclid(grid);
    if rem == 0 {
        pos
    } else {
        pos + grid - rem
    }
}

/// Whether `pos` lies exactly on a multiple of `grid`.
pub const fn on_grid(pos: i64, grid: i64) -> bool {
    assert!(grid > 0);
    pos.rem_euclid(grid) == 0
}
