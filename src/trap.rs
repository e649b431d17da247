/*!
Debug trap facility.

Purpose:
- Give programmer errors (illegal opcodes, instruction table collisions,
  cycle-count mismatches, VRAM index overflow) a single reporting path.

Behavior:
- Builds with `debug_assertions` or the `fatal_traps` feature panic at the
  trap site so the fault is caught under a debugger or in tests.
- Other builds log the trap through `log::error!` and the caller continues
  with its no-effect fallback.
*/

/// True when traps abort instead of degrading to a logged no-op.
pub const TRAPS_ARE_FATAL: bool = cfg!(any(debug_assertions, feature = "fatal_traps"));

/// Report a programmer error. Panics when [`TRAPS_ARE_FATAL`] is set,
/// otherwise logs and returns so the caller can fall back.
#[macro_export]
macro_rules! trap {
    ($($arg:tt)+) => {{
        if $crate::trap::TRAPS_ARE_FATAL {
            panic!("trap: {}", format_args!($($arg)+));
        } else {
            log::error!("trap: {}", format_args!($($arg)+));
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    #[cfg(any(debug_assertions, feature = "fatal_traps"))]
    #[should_panic(expected = "trap: bad opcode $02")]
    fn trap_panics_in_test_builds() {
        crate::trap!("bad opcode ${:02X}", 0x02);
    }
}
