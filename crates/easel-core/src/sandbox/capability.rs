//! Sandbox capabilities: the only things a candidate program can call.
//!
//! The namespace is built from scratch for every execution with
//! `Engine::new_raw`, a dummy module resolver and the core language
//! packages. Everything else must be granted here explicitly.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rhai::module_resolvers::DummyModuleResolver;
use rhai::packages::{BasicArrayPackage, BasicMathPackage, CorePackage, LogicPackage, Package};
use rhai::{Dynamic, Engine, EvalAltResult, FLOAT, INT};
use serde::{Deserialize, Serialize};

use super::surface;

/// A family of functions a candidate program may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// `new_surface` and the drawing API.
    Surface,
    /// Trigonometry, roots, rounding, `PI()`.
    Math,
    /// Seeded pseudo-random numbers.
    Random,
}

impl Capability {
    /// Function names this capability adds to the namespace.
    pub fn functions(&self) -> &'static [&'static str] {
        match self {
            Capability::Surface => &[
                "new_surface",
                "width",
                "height",
                "set_source_rgb",
                "set_source_rgba",
                "set_line_width",
                "paint",
                "new_path",
                "move_to",
                "line_to",
                "curve_to",
                "close_path",
                "rectangle",
                "arc",
                "fill",
                "stroke",
            ],
            Capability::Math => &[
                "sin", "cos", "tan", "asin", "acos", "atan", "sqrt", "exp", "ln", "log", "floor",
                "ceiling", "round", "PI", "E", "to_int", "to_float",
            ],
            Capability::Random => &["rand", "rand_float", "rand_int"],
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Surface => write!(f, "surface"),
            Capability::Math => write!(f, "math"),
            Capability::Random => write!(f, "random"),
        }
    }
}

/// Engine limits that make accidental blow-ups fail fast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineLimits {
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
    pub max_function_expr_depth: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_call_levels: 64,
            max_expr_depth: 128,
            max_function_expr_depth: 64,
            max_string_size: 1 << 20,
            max_array_size: 1 << 20,
            max_map_size: 1 << 16,
        }
    }
}

/// The allow-list a sandbox namespace is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    granted: Vec<Capability>,
    limits: EngineLimits,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::standard()
    }
}

impl Capabilities {
    /// Surface, math and random: what sketch programs are written against.
    pub fn standard() -> Self {
        Self {
            granted: vec![Capability::Surface, Capability::Math, Capability::Random],
            limits: EngineLimits::default(),
        }
    }

    /// Core language only.
    pub fn none() -> Self {
        Self {
            granted: Vec::new(),
            limits: EngineLimits::default(),
        }
    }

    /// Grant an additional capability.
    pub fn with(mut self, capability: Capability) -> Self {
        if !self.granted.contains(&capability) {
            self.granted.push(capability);
        }
        self
    }

    pub fn with_limits(mut self, limits: EngineLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.granted.contains(&capability)
    }

    pub fn granted(&self) -> &[Capability] {
        &self.granted
    }

    pub fn limits(&self) -> &EngineLimits {
        &self.limits
    }

    /// Every host function name visible to the program.
    pub fn function_names(&self) -> Vec<&'static str> {
        self.granted
            .iter()
            .flat_map(|c| c.functions().iter().copied())
            .collect()
    }

    /// Build a fresh namespace.
    ///
    /// The progress hook stops evaluation once `deadline` passes or
    /// `abandoned` is set, whichever comes first.
    pub(crate) fn build_engine(
        &self,
        seed: u64,
        deadline: Instant,
        abandoned: Arc<AtomicBool>,
    ) -> Engine {
        let mut engine = Engine::new_raw();
        engine.set_module_resolver(DummyModuleResolver::new());
        engine.register_global_module(CorePackage::new().as_shared_module());
        engine.register_global_module(LogicPackage::new().as_shared_module());
        engine.register_global_module(BasicArrayPackage::new().as_shared_module());

        let limits = &self.limits;
        engine
            .set_max_call_levels(limits.max_call_levels)
            .set_max_expr_depths(limits.max_expr_depth, limits.max_function_expr_depth)
            .set_max_string_size(limits.max_string_size)
            .set_max_array_size(limits.max_array_size)
            .set_max_map_size(limits.max_map_size);

        engine.on_print(|text| tracing::debug!(target: "easel::sketch", "{text}"));
        engine.on_debug(|text, _source, pos| {
            tracing::debug!(target: "easel::sketch", position = %pos, "{text}")
        });
        engine.on_progress(move |_ops| {
            if abandoned.load(Ordering::Relaxed) || Instant::now() >= deadline {
                Some(Dynamic::UNIT)
            } else {
                None
            }
        });

        if self.allows(Capability::Math) {
            engine.register_global_module(BasicMathPackage::new().as_shared_module());
        }
        if self.allows(Capability::Surface) {
            surface::register(&mut engine);
        }
        if self.allows(Capability::Random) {
            register_random(&mut engine, seed);
        }
        engine
    }
}

/// Accept either script number type.
pub(crate) fn number(value: &Dynamic) -> Result<FLOAT, Box<EvalAltResult>> {
    if let Ok(v) = value.as_float() {
        return Ok(v);
    }
    if let Ok(v) = value.as_int() {
        return Ok(v as FLOAT);
    }
    Err(format!("expected a number, got {}", value.type_name()).into())
}

fn register_random(engine: &mut Engine, seed: u64) {
    let rng = Rc::new(RefCell::new(StdRng::seed_from_u64(seed)));

    let r = Rc::clone(&rng);
    engine.register_fn("rand", move || -> FLOAT { r.borrow_mut().gen::<FLOAT>() });

    let r = Rc::clone(&rng);
    engine.register_fn(
        "rand_float",
        move |lo: Dynamic, hi: Dynamic| -> Result<FLOAT, Box<EvalAltResult>> {
            let (lo, hi) = (number(&lo)?, number(&hi)?);
            if !lo.is_finite() || !hi.is_finite() {
                return Err("rand_float bounds must be finite".into());
            }
            if lo >= hi {
                return Ok(lo);
            }
            Ok(r.borrow_mut().gen_range(lo..hi))
        },
    );

    let r = rng;
    engine.register_fn(
        "rand_int",
        move |lo: INT, hi: INT| -> Result<INT, Box<EvalAltResult>> {
            if lo > hi {
                return Err(format!("rand_int: empty range {lo}..={hi}").into());
            }
            Ok(r.borrow_mut().gen_range(lo..=hi))
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::surface::Surface;
    use std::time::Duration;

    fn engine(caps: &Capabilities) -> Engine {
        caps.build_engine(
            7,
            Instant::now() + Duration::from_secs(5),
            Arc::new(AtomicBool::new(false)),
        )
    }

    #[test]
    fn test_display_covers_all_variants() {
        assert_eq!(Capability::Surface.to_string(), "surface");
        assert_eq!(Capability::Math.to_string(), "math");
        assert_eq!(Capability::Random.to_string(), "random");
    }

    #[test]
    fn test_function_names_follow_grants() {
        let none = Capabilities::none();
        assert!(none.function_names().is_empty());

        let caps = Capabilities::none().with(Capability::Random);
        assert_eq!(caps.function_names(), vec!["rand", "rand_float", "rand_int"]);
        assert!(caps.allows(Capability::Random));
        assert!(!caps.allows(Capability::Surface));

        let standard = Capabilities::standard();
        assert!(standard.function_names().contains(&"new_surface"));
        assert!(standard.function_names().contains(&"sin"));
    }

    #[test]
    fn test_with_is_idempotent() {
        let caps = Capabilities::none()
            .with(Capability::Math)
            .with(Capability::Math);
        assert_eq!(caps.granted(), &[Capability::Math]);
    }

    #[test]
    fn test_core_language_available_without_grants() {
        let engine = engine(&Capabilities::none());
        let total: INT = engine
            .eval("let t = 0; for i in 0..10 { t += i; } t")
            .unwrap();
        assert_eq!(total, 45);
    }

    #[test]
    fn test_ungranted_functions_are_missing() {
        let engine = engine(&Capabilities::none());
        assert!(engine.eval::<Surface>("new_surface(10, 10)").is_err());
        assert!(engine.eval::<FLOAT>("rand()").is_err());
    }

    #[test]
    fn test_math_and_mixed_number_arguments() {
        let engine = engine(&Capabilities::standard());
        let v: FLOAT = engine.eval("sin(PI() / 2.0)").unwrap();
        assert!((v - 1.0).abs() < 1e-9);
        let s: Surface = engine.eval("new_surface(12, 8.0)").unwrap();
        assert_eq!((s.width(), s.height()), (12, 8));
    }

    #[test]
    fn test_random_is_seeded_and_bounded() {
        let caps = Capabilities::standard();
        let a: FLOAT = engine(&caps).eval("rand()").unwrap();
        let b: FLOAT = engine(&caps).eval("rand()").unwrap();
        assert_eq!(a, b);
        assert!((0.0..1.0).contains(&a));

        let n: INT = engine(&caps).eval("rand_int(3, 3)").unwrap();
        assert_eq!(n, 3);
        assert!(engine(&caps).eval::<INT>("rand_int(5, 1)").is_err());
    }

    #[test]
    fn test_import_is_not_resolvable() {
        let engine = engine(&Capabilities::standard());
        assert!(engine.run(r#"import "std" as s;"#).is_err());
    }
}
