use serde::{Deserialize, Serialize}; // Entities travel as JSON through the host
use std::collections::BTreeSet;

// --- Entity Contract ---

/// Matches entities against a sparsely populated query.
pub trait Criteria<T> {
    fn matches(&self, entity: &T) -> bool;
}

/// A record that can live in a repository backing list.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Human-readable kind, used in diagnostics ("student", "course").
    const KIND: &'static str;
    /// Filter-by-example query type for this entity.
    type Filter: Criteria<Self> + Default + Send + Sync;

    /// Unique key of the record inside its repository.
    fn id(&self) -> &str;
}

/// Returns the value when it carries a non-blank string.
/// Empty and whitespace-only values count as "not specified".
fn active(field: &Option<String>) -> Option<&str> {
    field
        .as_deref()
        .filter(|value| !value.trim().is_empty())
}

// --- Course ---

/// A course a student can be registered in.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Course {
    pub id: String,
    #[serde(rename = "courseName")] // Wire name kept from the public API
    pub name: String,
}

impl Course {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl Entity for Course {
    const KIND: &'static str = "course";
    type Filter = CourseFilter;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Query over courses. Every specified field must match.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct CourseFilter {
    /// Exact id match.
    pub id: Option<String>,
    /// Prefix match on the course name.
    #[serde(rename = "courseName")]
    pub name: Option<String>,
}

impl CourseFilter {
    /// Builds a filter from a partially filled course. Blank fields are ignored.
    pub fn from_example(example: &Course) -> Self {
        Self {
            id: Some(example.id.clone()),
            name: Some(example.name.clone()),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl Criteria<Course> for CourseFilter {
    fn matches(&self, course: &Course) -> bool {
        active(&self.id).is_none_or(|id| course.id == id)
            && active(&self.name).is_none_or(|prefix| course.name.starts_with(prefix))
    }
}

// --- Student ---

/// A student registered for a set of courses.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: i32,
    /// Ids of the courses the student currently attends.
    pub courses: BTreeSet<String>,
}

impl Student {
    pub fn new(
        id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        age: i32,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            age,
            courses: BTreeSet::new(),
        }
    }

    pub fn with_courses<I, S>(mut self, course_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register_courses(course_ids);
        self
    }

    /// Adds the given courses. Courses already taken are left as they are.
    pub fn register_courses<I, S>(&mut self, course_ids: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.courses.extend(course_ids.into_iter().map(Into::into));
        self
    }

    /// Drops a course. Dropping a course the student does not take is a no-op.
    pub fn drop_course(&mut self, course_id: &str) -> &mut Self {
        self.courses.remove(course_id);
        self
    }

    pub fn is_taking(&self, course_id: &str) -> bool {
        self.courses.contains(course_id)
    }
}

impl Entity for Student {
    const KIND: &'static str = "student";
    type Filter = StudentFilter;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Query over students. Every specified field must match.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct StudentFilter {
    /// Exact id match.
    pub id: Option<String>,
    /// Prefix match, case-sensitive.
    pub first_name: Option<String>,
    /// Prefix match, case-sensitive.
    pub last_name: Option<String>,
    /// Prefix match, case-sensitive.
    pub email: Option<String>,
    /// Exact age match.
    pub age: Option<i32>,
    /// The student must take every listed course (superset match).
    pub courses: BTreeSet<String>,
}

impl StudentFilter {
    /// Builds a filter from a partially filled student.
    ///
    /// Blank strings and an empty course set are ignored. An age of `0` is
    /// read as "not specified", so students aged 0 cannot be selected by age
    /// through this path; set `age` directly for that.
    pub fn from_example(example: &Student) -> Self {
        Self {
            id: Some(example.id.clone()),
            first_name: Some(example.first_name.clone()),
            last_name: Some(example.last_name.clone()),
            email: Some(example.email.clone()),
            age: (example.age != 0).then_some(example.age),
            courses: example.courses.clone(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_age(mut self, age: i32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_courses<I, S>(mut self, course_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.courses.extend(course_ids.into_iter().map(Into::into));
        self
    }
}

impl Criteria<Student> for StudentFilter {
    fn matches(&self, student: &Student) -> bool {
        active(&self.id).is_none_or(|id| student.id == id)
            && active(&self.first_name).is_none_or(|prefix| student.first_name.starts_with(prefix))
            && active(&self.last_name).is_none_or(|prefix| student.last_name.starts_with(prefix))
            && active(&self.email).is_none_or(|prefix| student.email.starts_with(prefix))
            && self.age.is_none_or(|age| student.age == age)
            && self.courses.is_subset(&student.courses)
    }
}
