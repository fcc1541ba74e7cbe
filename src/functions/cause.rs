//! Failure causes
//!
//! A handler fails with a [`Cause`], which records not only expected
//! domain errors but also defects, interruptions and compositions of
//! several failures. Domain errors convert into a cause with `?`:
//!
//! ```ignore
//! async fn get_show(ctx: FunctionContext, args: GetShow) -> Result<Show, Cause<ShowError>> {
//!     let doc = ctx.db()?.get(&args.id).await.map_err(Cause::die)?;
//!     let doc = doc.ok_or(ShowError::NotFound)?;
//!     ...
//! }
//! ```

use std::error::Error;
use std::fmt;

/// An unexpected failure carried through unchanged
pub type Defect = Box<dyn Error + Send + Sync + 'static>;

#[derive(Debug)]
pub enum Cause<E> {
    /// No failure recorded
    Empty,
    /// Expected, typed domain failure
    Fail(E),
    /// Unexpected defect
    Die(Defect),
    /// The handler was interrupted by the given fiber
    Interrupt(String),
    /// Two failures, one after the other
    Sequential(Box<Cause<E>>, Box<Cause<E>>),
    /// Two concurrent failures
    Parallel(Box<Cause<E>>, Box<Cause<E>>),
}

impl<E> Cause<E> {
    pub fn fail(error: E) -> Self {
        Cause::Fail(error)
    }

    pub fn die(defect: impl Into<Defect>) -> Self {
        Cause::Die(defect.into())
    }

    pub fn interrupt(fiber: impl Into<String>) -> Self {
        Cause::Interrupt(fiber.into())
    }

    pub fn sequential(left: Cause<E>, right: Cause<E>) -> Self {
        Cause::Sequential(Box::new(left), Box::new(right))
    }

    pub fn parallel(left: Cause<E>, right: Cause<E>) -> Self {
        Cause::Parallel(Box::new(left), Box::new(right))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cause::Empty => true,
            Cause::Sequential(left, right) | Cause::Parallel(left, right) => {
                left.is_empty() && right.is_empty()
            }
            Cause::Fail(_) | Cause::Die(_) | Cause::Interrupt(_) => false,
        }
    }

    /// Every domain failure in the cause, left to right
    pub fn failures(&self) -> Vec<&E> {
        let mut out = Vec::new();
        self.collect_failures(&mut out);
        out
    }

    fn collect_failures<'a>(&'a self, out: &mut Vec<&'a E>) {
        match self {
            Cause::Fail(e) => out.push(e),
            Cause::Sequential(left, right) | Cause::Parallel(left, right) => {
                left.collect_failures(out);
                right.collect_failures(out);
            }
            Cause::Empty | Cause::Die(_) | Cause::Interrupt(_) => {}
        }
    }

    /// Maps every domain failure, keeping the shape of the cause
    pub fn map<F>(self, f: impl Fn(E) -> F) -> Cause<F> {
        self.map_with(&f)
    }

    fn map_with<F>(self, f: &impl Fn(E) -> F) -> Cause<F> {
        match self {
            Cause::Empty => Cause::Empty,
            Cause::Fail(e) => Cause::Fail(f(e)),
            Cause::Die(defect) => Cause::Die(defect),
            Cause::Interrupt(fiber) => Cause::Interrupt(fiber),
            Cause::Sequential(left, right) => {
                Cause::sequential(left.map_with(f), right.map_with(f))
            }
            Cause::Parallel(left, right) => Cause::parallel(left.map_with(f), right.map_with(f)),
        }
    }
}

impl<E> From<E> for Cause<E> {
    fn from(error: E) -> Self {
        Cause::Fail(error)
    }
}

impl<E: fmt::Display> fmt::Display for Cause<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Empty => write!(f, "Empty"),
            Cause::Fail(e) => write!(f, "Fail({})", e),
            Cause::Die(defect) => write!(f, "Die({})", defect),
            Cause::Interrupt(fiber) => write!(f, "Interrupt({})", fiber),
            Cause::Sequential(left, right) => write!(f, "Sequential({}, {})", left, right),
            Cause::Parallel(left, right) => write!(f, "Parallel({}, {})", left, right),
        }
    }
}
