//! Gaussian mixture models over transformed length distributions.

pub mod component;
pub mod criteria;
pub mod dirichlet;
pub mod gmm;
pub mod select;

pub use component::{merge_overlapping, mixture_density, retain_components, MixtureComponent};
pub use criteria::{select_best, ComponentSelection, ModelCriteria};
pub use dirichlet::{fit_dirichlet, DirichletFit};
pub use gmm::{fit_gmm, GmmFit};
pub use select::{
    component_cap, fit_mixture, MixtureConfig, MixtureFit, SelectionScores, COMPONENT_LIMIT,
    MIN_MIXTURE_POINTS,
};
