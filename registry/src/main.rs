//! A little demo program for the managed heap: a student/lecture registry
//! whose objects all live in one collected arena.

use std::fmt;
use std::io::{self, Write};
use std::process;

use clap::{App, Arg};

use marksweep::{AllocError, Heap};

mod objects;

use crate::objects::{Lecture, Student, StudentList};

const DEFAULT_CAPACITY: usize = 50 * 1024;

/// Anything that can end the demo early
#[derive(Debug)]
enum DemoError {
    Alloc(AllocError),
    Io(io::Error),
}

impl fmt::Display for DemoError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DemoError::Alloc(error) => write!(f, "{}", error),
            DemoError::Io(error) => write!(f, "{}", error),
        }
    }
}

impl From<AllocError> for DemoError {
    fn from(other: AllocError) -> DemoError {
        DemoError::Alloc(other)
    }
}

impl From<io::Error> for DemoError {
    fn from(other: io::Error) -> DemoError {
        DemoError::Io(other)
    }
}

/// Build the registry graph, let parts of it die, and dump the heap at each
/// interesting point.
fn run<W: Write>(capacity: usize, out: &mut W) -> Result<(), DemoError> {
    let mut heap = Heap::with_capacity(capacity)?;

    writeln!(out, "Heap after creation without anything allocated yet:")?;
    heap.dump(out)?;

    // The list is the single root; everything else hangs off it
    let list = heap.alloc(StudentList::new(), true)?;

    let systems = heap.alloc(Lecture::new(1, "Systems Programming", 7), false)?;
    let compilers = heap.alloc(Lecture::new(2, "Compiler Construction", 7), false)?;
    let databases = heap.alloc(Lecture::new(3, "Database Theory", 7), false)?;

    let alice = heap.alloc(Student::new(1, "alice"), false)?;
    let bob = heap.alloc(Student::new(2, "bob"), false)?;
    let carlos = heap.alloc(Student::new(3, "carlos"), false)?;

    unsafe {
        list.as_ref().add(&mut heap, alice)?;
        list.as_ref().add(&mut heap, bob)?;

        alice.as_ref().add(&mut heap, systems)?;
        alice.as_ref().add(&mut heap, compilers)?;
        alice.as_ref().add(&mut heap, databases)?;
        bob.as_ref().add(&mut heap, compilers)?;
        bob.as_ref().add(&mut heap, databases)?;
        carlos.as_ref().add(&mut heap, systems)?;
        carlos.as_ref().add(&mut heap, databases)?;

        list.as_ref().add(&mut heap, carlos)?;
    }

    writeln!(out, "Heap after allocating some objects, all still alive:")?;
    heap.dump(out)?;

    unsafe {
        list.as_ref().remove(carlos);
        alice.as_ref().remove(systems);
    }

    writeln!(out, "Heap after some objects died, but before garbage collection:")?;
    heap.dump(out)?;

    heap.gc();

    writeln!(out, "Heap after garbage collection:")?;
    heap.dump(out)?;

    unsafe {
        heap.remove_root(list.untyped());
    }
    heap.gc();

    writeln!(out, "Heap after removing the single root pointer and performing GC:")?;
    heap.dump(out)?;

    Ok(())
}

fn main() {
    // parse command line arguments, an optional heap capacity
    let matches = App::new("registry")
        .about("Managed-heap demo: a student/lecture registry")
        .arg(
            Arg::with_name("capacity")
                .help("Heap payload capacity in bytes")
                .index(1),
        )
        .get_matches();

    let capacity = match matches.value_of("capacity") {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            eprintln!("Invalid capacity: {}", raw);
            process::exit(1);
        }),
        None => DEFAULT_CAPACITY,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    run(capacity, &mut out).unwrap_or_else(|err| {
        eprintln!("Terminated: {}", err);
        process::exit(1);
    });
}
