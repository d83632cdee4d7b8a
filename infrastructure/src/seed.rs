//! Sample records used to pre-populate the stores at startup.

use domain::{Course, Student};

pub fn sample_students() -> Vec<Student> {
    vec![
        Student::new("student-1", "John", "Smith", "John.Smith@university.edu", 20)
            .with_courses(["EN 102", "CS 400", "BS 322"]),
        Student::new("student-2", "Anna", "Smith", "Anna.Smith@university.edu", 20)
            .with_courses(["EN 102", "CS 400", "BS 450"]),
        Student::new("student-3", "Charles", "Xavier", "Charles.Xavier@university.edu", 20)
            .with_courses(["MA 200", "PS 230"]),
    ]
}

pub fn sample_courses() -> Vec<Course> {
    vec![
        Course::new("EN 102", "Introduction to English"),
        Course::new("CS 400", "Computer Architecture"),
        Course::new("BS 322", "Introduction to Cost Accounting"),
    ]
}
