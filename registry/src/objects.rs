//! The managed object types of the demo: a registry of students and the
//! lectures they attend, linked through heap-allocated list nodes.
//!
//! Every type is `repr(C)` with its pointer fields in `Link` slots, and
//! declares those fields through `managed_type!` so the collector can trace
//! them precisely.

use marksweep::{managed_type, AllocError, Heap, Link, ObjectPtr};

#[repr(C)]
pub struct Lecture {
    pub id: u32,
    pub name: &'static str,
    pub semester: u32,
}

managed_type!(Lecture);

impl Lecture {
    pub fn new(id: u32, name: &'static str, semester: u32) -> Lecture {
        Lecture { id, name, semester }
    }
}

#[repr(C)]
pub struct LectureNode {
    pub next: Link<LectureNode>,
    pub lecture: Link<Lecture>,
}

managed_type!(LectureNode, next, lecture);

#[repr(C)]
pub struct Student {
    pub id: u32,
    pub name: &'static str,
    pub lectures: Link<LectureNode>,
}

managed_type!(Student, lectures);

impl Student {
    pub fn new(id: u32, name: &'static str) -> Student {
        Student {
            id,
            name,
            lectures: Link::null(),
        }
    }

    /// Prepend a lecture to this student's lecture list
    pub fn add(&self, heap: &mut Heap, lecture: ObjectPtr<Lecture>) -> Result<(), AllocError> {
        let node = heap.alloc(
            LectureNode {
                next: self.lectures.clone(),
                lecture: Link::new(lecture),
            },
            false,
        )?;
        self.lectures.set(node);
        Ok(())
    }

    /// Unlink every node referring to `lecture`
    pub fn remove(&self, lecture: ObjectPtr<Lecture>) {
        let mut prev: *mut LectureNode = std::ptr::null_mut();
        let mut cur = self.lectures.raw();
        unsafe {
            while !cur.is_null() {
                let node = &*cur;
                let next = node.next.raw();
                if node.lecture.raw() == lecture.raw() {
                    if prev.is_null() {
                        self.lectures.set_raw(next);
                    } else {
                        (*prev).next.set_raw(next);
                    }
                } else {
                    prev = cur;
                }
                cur = next;
            }
        }
    }
}

#[repr(C)]
pub struct StudentNode {
    pub next: Link<StudentNode>,
    pub student: Link<Student>,
}

managed_type!(StudentNode, next, student);

#[repr(C)]
pub struct StudentList {
    pub first: Link<StudentNode>,
}

managed_type!(StudentList, first);

impl StudentList {
    pub fn new() -> StudentList {
        StudentList { first: Link::null() }
    }

    /// Prepend a student to the list
    pub fn add(&self, heap: &mut Heap, student: ObjectPtr<Student>) -> Result<(), AllocError> {
        let node = heap.alloc(
            StudentNode {
                next: self.first.clone(),
                student: Link::new(student),
            },
            false,
        )?;
        self.first.set(node);
        Ok(())
    }

    /// Unlink every node referring to `student`
    pub fn remove(&self, student: ObjectPtr<Student>) {
        let mut prev: *mut StudentNode = std::ptr::null_mut();
        let mut cur = self.first.raw();
        unsafe {
            while !cur.is_null() {
                let node = &*cur;
                let next = node.next.raw();
                if node.student.raw() == student.raw() {
                    if prev.is_null() {
                        self.first.set_raw(next);
                    } else {
                        (*prev).next.set_raw(next);
                    }
                } else {
                    prev = cur;
                }
                cur = next;
            }
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn count_students(list: &StudentList) -> usize {
        let mut count = 0;
        let mut cur = list.first.raw();
        unsafe {
            while !cur.is_null() {
                count += 1;
                cur = (*cur).next.raw();
            }
        }
        count
    }

    #[test]
    fn test_add_and_remove() {
        let mut heap = Heap::with_capacity(4096).unwrap();

        let list = heap.alloc(StudentList::new(), true).unwrap();
        let alice = heap.alloc(Student::new(1, "alice"), false).unwrap();
        let bob = heap.alloc(Student::new(2, "bob"), false).unwrap();
        let carlos = heap.alloc(Student::new(3, "carlos"), false).unwrap();

        unsafe {
            let list = list.as_ref();
            list.add(&mut heap, alice).unwrap();
            list.add(&mut heap, bob).unwrap();
            list.add(&mut heap, carlos).unwrap();
            assert!(count_students(list) == 3);

            list.remove(bob);
            assert!(count_students(list) == 2);

            // removing the head works too
            list.remove(carlos);
            assert!(count_students(list) == 1);
        }
    }

    #[test]
    fn test_remove_unlinks_adjacent_duplicates() {
        let mut heap = Heap::with_capacity(4096).unwrap();

        let list = heap.alloc(StudentList::new(), true).unwrap();
        let alice = heap.alloc(Student::new(1, "alice"), false).unwrap();
        let bob = heap.alloc(Student::new(2, "bob"), false).unwrap();

        unsafe {
            let list = list.as_ref();
            list.add(&mut heap, bob).unwrap();
            list.add(&mut heap, alice).unwrap();
            list.add(&mut heap, alice).unwrap();
            assert!(count_students(list) == 3);

            list.remove(alice);
            assert!(count_students(list) == 1);
            assert!((*list.first.raw()).student.raw() == bob.raw());
        }
    }

    #[test]
    fn test_dropped_students_are_collected() {
        let mut heap = Heap::with_capacity(4096).unwrap();

        let list = heap.alloc(StudentList::new(), true).unwrap();
        let systems = heap.alloc(Lecture::new(1, "Systems Programming", 7), false).unwrap();

        let alice = heap.alloc(Student::new(1, "alice"), false).unwrap();
        let bob = heap.alloc(Student::new(2, "bob"), false).unwrap();
        unsafe {
            let list = list.as_ref();
            list.add(&mut heap, alice).unwrap();
            list.add(&mut heap, bob).unwrap();
            alice.as_ref().add(&mut heap, systems).unwrap();
            bob.as_ref().add(&mut heap, systems).unwrap();

            list.remove(bob);
        }

        heap.gc();

        // bob and his nodes are gone; the shared lecture survives through
        // alice: list, alice's node, alice, her lecture node, the lecture
        let stats = heap.collect_stats(true);
        assert!(stats.num_live_objects == 5);
        assert!(stats.num_objects == 5);

        unsafe {
            assert!(alice.as_ref().name == "alice");
            let node = alice.as_ref().lectures.get().unwrap();
            let lecture = node.as_ref().lecture.get().unwrap();
            assert!(lecture.as_ref().name == "Systems Programming");
        }
    }
}
