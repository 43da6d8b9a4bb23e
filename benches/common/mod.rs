#![allow(dead_code)]
use std::fmt::Write;

/// Workloads by repeated-block count; each block is [`LINES_PER_GROUP`]
/// lines ending in an introspected assignment.
pub const WORKLOADS: [(&str, usize); 2] = [("small", 16), ("large", 256)];

pub const LINES_PER_GROUP: usize = 5;
pub const PRELUDE_LINES: usize = 2;

/// Builds a runnable program: a two-line helper function, then `groups`
/// blocks of two plain assignments, a loop, and one `scry.target()`
/// assignment, followed by a single line of nested bare-name calls.
pub fn synthesize_source(groups: usize) -> String {
    let mut source = String::new();
    writeln!(source, "def check(k):").expect("write source");
    writeln!(source, "    return k + 1").expect("write source");
    for index in 0..groups {
        writeln!(source, "base_{index} = {index} * 3 + 1").expect("write source");
        writeln!(source, "total_{index} = 0").expect("write source");
        writeln!(source, "for step in range(4):").expect("write source");
        writeln!(source, "    total_{index} = total_{index} + step").expect("write source");
        writeln!(source, "name_{index} = scry.target()").expect("write source");
    }
    writeln!(source, "checked = check(check(1))").expect("write source");
    source
}

/// Line of the last block's `scry.target()` call.
pub fn introspected_line(groups: usize) -> usize {
    PRELUDE_LINES + groups * LINES_PER_GROUP
}

/// Line of the trailing nested bare-name calls.
pub fn named_call_line(groups: usize) -> usize {
    PRELUDE_LINES + groups * LINES_PER_GROUP + 1
}
