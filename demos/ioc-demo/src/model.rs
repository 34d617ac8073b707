use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub name: String,
    pub age: u32,
    pub gender: String,
}

impl Person {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            age: 20,
            gender: "男".to_string(),
        }
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Person(name={}, age={}, gender={})",
            self.name, self.age, self.gender
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dog {
    pub name: String,
}

impl Dog {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl fmt::Display for Dog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dog(name={})", self.name)
    }
}
