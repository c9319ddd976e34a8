//! Debug assertion macros for circular-store invariants.
//!
//! Only active in debug builds (`#[cfg(debug_assertions)]`), so there is
//! zero overhead in release builds. Used by `Ring`.

// =============================================================================
// INV-RING-01: Bounded Occupancy
// =============================================================================

/// Assert that the number of valid entries never exceeds capacity.
///
/// **Invariant**: `0 <= valid_count <= capacity`
macro_rules! debug_assert_bounded_occupancy {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "INV-RING-01 violated: valid_count {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

// =============================================================================
// INV-RING-02: In/Out Within Bounds
// =============================================================================

/// Assert that the `in`/`out` cursors stay within `[0, capacity)`.
macro_rules! debug_assert_cursor_in_bounds {
    ($name:literal, $cursor:expr, $capacity:expr) => {
        debug_assert!(
            $cursor < $capacity,
            "INV-RING-02 violated: {} cursor {} out of bounds for capacity {}",
            $name,
            $cursor,
            $capacity
        )
    };
}

// =============================================================================
// INV-RING-03: Exactly-Once Release
// =============================================================================

/// Assert that an overwritten slot was non-empty before release (it held an
/// owned entry exactly once, and is about to be freed exactly once).
macro_rules! debug_assert_slot_occupied_before_overwrite {
    ($is_full:expr, $slot_is_some:expr) => {
        debug_assert!(
            !$is_full || $slot_is_some,
            "INV-RING-03 violated: overwriting a full ring's slot that held no entry"
        )
    };
}

// =============================================================================
// INV-RING-04: Non-Degenerate Entries
// =============================================================================

/// Assert that a committed entry is never empty — every packet includes at
/// least the terminating newline.
macro_rules! debug_assert_entry_nonempty {
    ($len:expr) => {
        debug_assert!($len > 0, "INV-RING-04 violated: committed a zero-length entry")
    };
}

pub(crate) use debug_assert_bounded_occupancy;
pub(crate) use debug_assert_cursor_in_bounds;
pub(crate) use debug_assert_entry_nonempty;
pub(crate) use debug_assert_slot_occupied_before_overwrite;
