mod binding;
mod path;
mod template;

pub use binding::{classify_parameters, Binding};
pub use path::{DocPath, PathSyntaxError};
pub use template::{parse_template, Segment, Template, TemplateError};
