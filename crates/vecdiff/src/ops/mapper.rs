//! Gathering through a [`Mapper`].

use std::fmt;
use std::rc::Rc;

use crate::backend::{Mapper, Vector};
use crate::error::DiffError;
use crate::graph::{Grad, Node, Res, VarSet};
use crate::scalar::Scalar;

struct Mapped<T: Scalar> {
    input: Res<T>,
    mapper: Rc<dyn Mapper<T>>,
    transposed: bool,
    out: Vector<T>,
}

impl<T: Scalar> fmt::Debug for Mapped<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapped")
            .field("in_size", &self.mapper.in_size())
            .field("out_size", &self.mapper.out_size())
            .field("transposed", &self.transposed)
            .finish()
    }
}

impl<T: Scalar> Node<T> for Mapped<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.input.vars()
    }

    fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>) {
        let mut down = Vector::zeros(self.input.len());
        if self.transposed {
            self.mapper.map(&upstream, &mut down);
        } else {
            self.mapper.map_transpose(&upstream, &mut down);
        }
        self.input.propagate(down, grad);
    }
}

fn check_size(len: usize, expected: usize) -> Result<(), DiffError> {
    if len != expected {
        return Err(DiffError::LengthMismatch {
            expected,
            actual: len,
        });
    }
    Ok(())
}

/// Apply `mapper` to `r`.
///
/// # Errors
///
/// Returns `LengthMismatch` if `r.len()` is not the mapper's input size.
pub fn map<T, M>(r: &Res<T>, mapper: M) -> Result<Res<T>, DiffError>
where
    T: Scalar,
    M: Mapper<T> + 'static,
{
    check_size(r.len(), mapper.in_size())?;
    let mut out = Vector::zeros(mapper.out_size());
    mapper.map(&r.output(), &mut out);
    Ok(Res::new(Mapped {
        input: r.clone(),
        mapper: Rc::new(mapper),
        transposed: false,
        out,
    }))
}

/// Apply the transpose of `mapper` to `r`.
///
/// # Errors
///
/// Returns `LengthMismatch` if `r.len()` is not the mapper's output size.
pub fn map_transpose<T, M>(r: &Res<T>, mapper: M) -> Result<Res<T>, DiffError>
where
    T: Scalar,
    M: Mapper<T> + 'static,
{
    check_size(r.len(), mapper.out_size())?;
    let mut out = Vector::zeros(mapper.in_size());
    mapper.map_transpose(&r.output(), &mut out);
    Ok(Res::new(Mapped {
        input: r.clone(),
        mapper: Rc::new(mapper),
        transposed: true,
        out,
    }))
}
