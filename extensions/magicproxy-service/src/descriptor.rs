use magicproxy::state::ConnectionFlags;
use std::any::type_name;

/// How a type is passed, as far as the contract validator cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeShape {
    /// Owned value; the only shape allowed for parameters.
    Value,
    Reference,
    MutableReference,
    RawPointer,
    /// A method-level type parameter, resolved at call time.
    Generic,
}

/// Static description of a parameter or return element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    name: &'static str,
    shape: TypeShape,
}

impl TypeDescriptor {
    pub fn of<T: ?Sized>() -> Self {
        let name = type_name::<T>();
        Self {
            name,
            shape: shape_of(name),
        }
    }

    /// Describes a type by name only, e.g. `Vec<T>` inside a generic method.
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            shape: shape_of(name),
        }
    }

    /// Describes a method type parameter such as `T`.
    pub fn generic(name: &'static str) -> Self {
        Self {
            name,
            shape: TypeShape::Generic,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn shape(&self) -> TypeShape {
        self.shape
    }

    /// `true` for parameters that would alias caller memory.
    pub fn is_by_reference(&self) -> bool {
        matches!(
            self.shape,
            TypeShape::Reference | TypeShape::MutableReference | TypeShape::RawPointer
        )
    }

    /// Raw byte sequences bypass structured encoding on the wire.
    pub fn is_raw_bytes(&self) -> bool {
        self.name == type_name::<Vec<u8>>()
    }

    pub fn is_bool(&self) -> bool {
        self.name == type_name::<bool>()
    }
}

fn shape_of(name: &str) -> TypeShape {
    if name.starts_with("&mut ") {
        TypeShape::MutableReference
    } else if name.starts_with('&') {
        TypeShape::Reference
    } else if name.starts_with("*const ") || name.starts_with("*mut ") {
        TypeShape::RawPointer
    } else {
        TypeShape::Value
    }
}

/// The declared result of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// Resolves asynchronously to a value of the given type.
    Future(TypeDescriptor),
    /// Resolves asynchronously to nothing.
    FutureUnit,
    /// Returns synchronously. Never valid in a service contract.
    Immediate(TypeDescriptor),
}

impl ReturnShape {
    pub fn future<T: ?Sized>() -> Self {
        ReturnShape::Future(TypeDescriptor::of::<T>())
    }

    pub fn future_generic(type_param: &'static str) -> Self {
        ReturnShape::Future(TypeDescriptor::generic(type_param))
    }

    pub fn unit() -> Self {
        ReturnShape::FutureUnit
    }

    pub fn immediate<T: ?Sized>() -> Self {
        ReturnShape::Immediate(TypeDescriptor::of::<T>())
    }

    pub fn is_future(&self) -> bool {
        !matches!(self, ReturnShape::Immediate(_))
    }

    pub fn element(&self) -> Option<&TypeDescriptor> {
        match self {
            ReturnShape::Future(ty) | ReturnShape::Immediate(ty) => Some(ty),
            ReturnShape::FutureUnit => None,
        }
    }

    pub fn is_raw_bytes(&self) -> bool {
        self.element().is_some_and(TypeDescriptor::is_raw_bytes)
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, ReturnShape::FutureUnit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MethodKind {
    #[default]
    Normal,
    /// Performs a login; must resolve to `bool`.
    Authenticate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub name: &'static str,
    pub ty: TypeDescriptor,
}

/// Builder-style description of one service method.
///
/// A method starts out returning a unit future with no parameters and no
/// flag requirement of its own (it inherits the interface default).
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub(crate) name: String,
    pub(crate) params: Vec<ParamDescriptor>,
    pub(crate) type_params: Vec<&'static str>,
    pub(crate) returns: ReturnShape,
    pub(crate) required_flags: Option<u32>,
    pub(crate) kind: MethodKind,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            type_params: Vec::new(),
            returns: ReturnShape::FutureUnit,
            required_flags: None,
            kind: MethodKind::Normal,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a positional parameter of type `T`.
    pub fn param<T: ?Sized>(mut self, name: &'static str) -> Self {
        self.params.push(ParamDescriptor {
            name,
            ty: TypeDescriptor::of::<T>(),
        });
        self
    }

    /// Appends a positional parameter typed by one of the method's type parameters.
    pub fn generic_param(mut self, name: &'static str, type_param: &'static str) -> Self {
        self.params.push(ParamDescriptor {
            name,
            ty: TypeDescriptor::generic(type_param),
        });
        self
    }

    /// Declares a method-level type parameter. Order matters: callers send
    /// type arguments in declaration order.
    pub fn type_param(mut self, name: &'static str) -> Self {
        self.type_params.push(name);
        self
    }

    pub fn returns(mut self, shape: ReturnShape) -> Self {
        self.returns = shape;
        self
    }

    /// Overrides the interface default requirement for this method.
    pub fn requires<F: ConnectionFlags>(self, flags: F) -> Self {
        self.requires_bits(flags.to_wire())
    }

    pub fn requires_bits(mut self, bits: u32) -> Self {
        self.required_flags = Some(bits);
        self
    }

    pub fn authenticate(mut self) -> Self {
        self.kind = MethodKind::Authenticate;
        self
    }
}

/// Description of a whole service interface, consumed by
/// [`ServiceContract::build`](crate::ServiceContract::build).
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub(crate) name: String,
    pub(crate) default_required: Option<u32>,
    pub(crate) known_flags: u32,
    pub(crate) describe_flags: fn(u32) -> String,
    pub(crate) methods: Vec<MethodDescriptor>,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_required: None,
            known_flags: u32::MAX,
            describe_flags: describe_bits,
            methods: Vec::new(),
        }
    }

    /// Binds the interface to its connection flag type. Required masks are
    /// then checked against the bits `F` defines, and rendered by name.
    pub fn with_flags<F: ConnectionFlags>(mut self) -> Self {
        self.known_flags = F::known_bits();
        self.describe_flags = F::describe;
        self
    }

    /// Requirement applied to every method without its own annotation.
    pub fn default_required<F: ConnectionFlags>(mut self, flags: F) -> Self {
        self.default_required = Some(flags.to_wire());
        self
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }
}

fn describe_bits(bits: u32) -> String {
    format!("{bits:#x}")
}
