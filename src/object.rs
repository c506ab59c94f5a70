//! Classes, instances and method resolution.
//!
//! Classes live in an arena ([`ClassRegistry`]) and refer to their bases
//! through [`ClassId`] handles. The linearization is deliberately simple:
//! the class itself followed by each base's own order, first occurrence
//! kept. It is not C3, and on diamonds a shared ancestor is visited before
//! later siblings.

use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;

use crate::value::{FunctionDef, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(usize);

impl ClassId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle carried by class values and instances.
#[derive(Debug, Clone)]
pub struct ClassRef {
    pub id: ClassId,
    pub name: Rc<str>,
}

#[derive(Debug, Clone, Default)]
pub struct Property {
    pub getter: Option<Rc<FunctionDef>>,
    pub setter: Option<Rc<FunctionDef>>,
}

#[derive(Debug)]
pub struct Class {
    pub id: ClassId,
    pub name: Rc<str>,
    pub bases: Vec<ClassId>,
    pub methods: IndexMap<String, Rc<FunctionDef>>,
    pub static_methods: IndexMap<String, Rc<FunctionDef>>,
    pub class_methods: IndexMap<String, Rc<FunctionDef>>,
    pub properties: IndexMap<String, Property>,
    pub instance_defaults: IndexMap<String, Value>,
    pub mro: Vec<ClassId>,
}

impl Class {
    pub fn handle(&self) -> ClassRef {
        ClassRef {
            id: self.id,
            name: Rc::clone(&self.name),
        }
    }
}

pub struct Object {
    pub class: ClassRef,
    pub attributes: RefCell<IndexMap<String, Value>>,
}

pub type ObjectRef = Rc<Object>;

#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: Vec<Class>,
    by_name: IndexMap<String, ClassId>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next inserted class will receive. Methods are built against
    /// it before the class itself exists.
    pub fn next_id(&self) -> ClassId {
        ClassId(self.classes.len())
    }

    /// Store a class built against [`ClassRegistry::next_id`]. A class with
    /// the same name is shadowed; existing instances keep their old class.
    pub fn insert(&mut self, class: Class) -> ClassId {
        let id = class.id;
        debug_assert_eq!(id, self.next_id());
        self.by_name.insert(class.name.to_string(), id);
        self.classes.push(class);
        id
    }

    pub fn get(&self, id: ClassId) -> &Class {
        &self.classes[id.0]
    }

    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// `[class]` followed by every base's order, duplicates dropped after
    /// their first occurrence.
    pub fn compute_mro(&self, class: ClassId, bases: &[ClassId]) -> Vec<ClassId> {
        let mut mro = vec![class];
        for base in bases {
            for ancestor in &self.get(*base).mro {
                if !mro.contains(ancestor) {
                    mro.push(*ancestor);
                }
            }
        }
        mro
    }

    pub fn mro_names(&self, id: ClassId) -> Vec<String> {
        self.get(id)
            .mro
            .iter()
            .map(|class| self.get(*class).name.to_string())
            .collect()
    }

    /// First hit of `select` along `order`.
    fn find_in<T>(&self, order: &[ClassId], select: impl Fn(&Class) -> Option<T>) -> Option<T> {
        order.iter().find_map(|id| select(self.get(*id)))
    }

    pub fn find_method(&self, id: ClassId, name: &str) -> Option<Rc<FunctionDef>> {
        self.find_in(&self.get(id).mro, |class| class.methods.get(name).cloned())
    }

    pub fn find_static(&self, id: ClassId, name: &str) -> Option<Rc<FunctionDef>> {
        self.find_in(&self.get(id).mro, |class| class.static_methods.get(name).cloned())
    }

    pub fn find_class_method(&self, id: ClassId, name: &str) -> Option<Rc<FunctionDef>> {
        self.find_in(&self.get(id).mro, |class| class.class_methods.get(name).cloned())
    }

    pub fn find_property(&self, id: ClassId, name: &str) -> Option<Property> {
        self.find_in(&self.get(id).mro, |class| class.properties.get(name).cloned())
    }

    pub fn find_default(&self, id: ClassId, name: &str) -> Option<Value> {
        self.find_in(&self.get(id).mro, |class| {
            class.instance_defaults.get(name).cloned()
        })
    }

    /// Member lookup for `super()`: the defining class's order without the
    /// defining class itself.
    pub fn find_after(&self, defining: ClassId, name: &str) -> Option<SuperMember> {
        let order = &self.get(defining).mro[1..];
        self.find_in(order, |class| {
            if let Some(method) = class.methods.get(name) {
                return Some(SuperMember::Method(Rc::clone(method)));
            }
            if let Some(property) = class.properties.get(name) {
                return Some(SuperMember::Property(property.clone()));
            }
            if let Some(method) = class.static_methods.get(name) {
                return Some(SuperMember::Static(Rc::clone(method)));
            }
            class
                .class_methods
                .get(name)
                .map(|method| SuperMember::ClassMethod(Rc::clone(method)))
        })
    }

    pub fn is_subclass(&self, id: ClassId, ancestor: ClassId) -> bool {
        self.get(id).mro.contains(&ancestor)
    }

    /// Every member name reachable through `id`'s order, for suggestions.
    pub fn member_names(&self, id: ClassId) -> Vec<String> {
        let mut names = Vec::new();
        for class in &self.get(id).mro {
            let class = self.get(*class);
            names.extend(class.methods.keys().cloned());
            names.extend(class.static_methods.keys().cloned());
            names.extend(class.class_methods.keys().cloned());
            names.extend(class.properties.keys().cloned());
            names.extend(class.instance_defaults.keys().cloned());
        }
        names.dedup();
        names
    }
}

/// What a `super()` lookup found.
pub enum SuperMember {
    Method(Rc<FunctionDef>),
    Property(Property),
    Static(Rc<FunctionDef>),
    ClassMethod(Rc<FunctionDef>),
}
