use std::fmt;

use super::BindingError;

/// Kind of resource a program declares at a binding index.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Storage buffer.
    Buffer { read_only: bool },
    /// 2D float image read with `textureLoad`.
    Image,
}

impl ResourceKind {
    pub const fn storage() -> Self {
        Self::Buffer { read_only: false }
    }

    pub const fn storage_read_only() -> Self {
        Self::Buffer { read_only: true }
    }

    pub(crate) fn layout_type(self) -> wgpu::BindingType {
        match self {
            Self::Buffer { read_only } => wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            Self::Image => wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffer { read_only: true } => f.write_str("read-only buffer"),
            Self::Buffer { read_only: false } => f.write_str("buffer"),
            Self::Image => f.write_str("image"),
        }
    }
}

/// A caller-supplied handle tagged with its own kind.
///
/// Generic over the handle types so the resolution rules are independent of
/// the GPU backend; programs use `BoundResource<&wgpu::Buffer, &wgpu::TextureView>`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BoundResource<B, I> {
    Buffer(B),
    Image(I),
}

impl<B, I> BoundResource<B, I> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Buffer(_) => "buffer",
            Self::Image(_) => "image",
        }
    }

    fn matches(&self, kind: ResourceKind) -> bool {
        matches!(
            (self, kind),
            (Self::Buffer(_), ResourceKind::Buffer { .. }) | (Self::Image(_), ResourceKind::Image)
        )
    }
}

/// Checks `supplied` against `declared` and returns the bindings sorted by index.
///
/// Every declared index must receive exactly one handle of the declared kind,
/// and nothing may be supplied for an undeclared index.
pub fn resolve_bindings<B: Copy, I: Copy>(
    declared: &[(u32, ResourceKind)],
    supplied: &[(u32, BoundResource<B, I>)],
) -> Result<Vec<(u32, BoundResource<B, I>)>, BindingError> {
    let mut resolved: Vec<(u32, BoundResource<B, I>)> = Vec::with_capacity(supplied.len());

    for &(index, resource) in supplied {
        let Some(&(_, kind)) = declared.iter().find(|(i, _)| *i == index) else {
            return Err(BindingError::UndeclaredBinding { index });
        };
        if !resource.matches(kind) {
            return Err(BindingError::KindMismatch {
                index,
                declared: kind,
                supplied: resource.kind_name(),
            });
        }
        if resolved.iter().any(|(i, _)| *i == index) {
            return Err(BindingError::DuplicateBinding { index });
        }
        resolved.push((index, resource));
    }

    if let Some(&(index, _)) = declared
        .iter()
        .find(|(i, _)| !resolved.iter().any(|(r, _)| r == i))
    {
        return Err(BindingError::MissingBinding { index });
    }

    resolved.sort_by_key(|(i, _)| *i);
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    type Handle = BoundResource<u32, u32>;

    fn layout() -> Vec<(u32, ResourceKind)> {
        vec![
            (0, ResourceKind::Image),
            (1, ResourceKind::Image),
            (2, ResourceKind::storage()),
        ]
    }

    // ── accepted ──────────────────────────────────────────────────────────

    #[test]
    fn matching_handles_resolve_sorted() {
        let supplied: [(u32, Handle); 3] = [
            (2, BoundResource::Buffer(7)),
            (0, BoundResource::Image(3)),
            (1, BoundResource::Image(4)),
        ];
        let resolved = resolve_bindings(&layout(), &supplied).unwrap();
        let indices: Vec<u32> = resolved.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(resolved[2].1, BoundResource::Buffer(7));
    }

    #[test]
    fn read_only_declaration_accepts_any_buffer_handle() {
        let declared = [(0, ResourceKind::storage_read_only())];
        let supplied: [(u32, Handle); 1] = [(0, BoundResource::Buffer(1))];
        assert!(resolve_bindings(&declared, &supplied).is_ok());
    }

    #[test]
    fn resolving_twice_is_idempotent() {
        let supplied: [(u32, Handle); 3] = [
            (0, BoundResource::Image(3)),
            (1, BoundResource::Image(4)),
            (2, BoundResource::Buffer(7)),
        ];
        let a = resolve_bindings(&layout(), &supplied).unwrap();
        let b = resolve_bindings(&layout(), &supplied).unwrap();
        assert_eq!(a, b);
    }

    // ── rejected ──────────────────────────────────────────────────────────

    #[test]
    fn buffer_where_image_declared_is_rejected() {
        let supplied: [(u32, Handle); 3] = [
            (0, BoundResource::Buffer(3)),
            (1, BoundResource::Image(4)),
            (2, BoundResource::Buffer(7)),
        ];
        let err = resolve_bindings(&layout(), &supplied).unwrap_err();
        assert_eq!(
            err,
            BindingError::KindMismatch {
                index: 0,
                declared: ResourceKind::Image,
                supplied: "buffer",
            }
        );
    }

    #[test]
    fn image_where_buffer_declared_is_rejected() {
        let supplied: [(u32, Handle); 3] = [
            (0, BoundResource::Image(3)),
            (1, BoundResource::Image(4)),
            (2, BoundResource::Image(7)),
        ];
        assert!(matches!(
            resolve_bindings(&layout(), &supplied),
            Err(BindingError::KindMismatch { index: 2, .. })
        ));
    }

    #[test]
    fn undeclared_index_is_rejected() {
        let supplied: [(u32, Handle); 1] = [(9, BoundResource::Buffer(1))];
        assert_eq!(
            resolve_bindings(&layout(), &supplied),
            Err(BindingError::UndeclaredBinding { index: 9 })
        );
    }

    #[test]
    fn missing_index_is_rejected() {
        let supplied: [(u32, Handle); 2] = [
            (0, BoundResource::Image(3)),
            (2, BoundResource::Buffer(7)),
        ];
        assert_eq!(
            resolve_bindings(&layout(), &supplied),
            Err(BindingError::MissingBinding { index: 1 })
        );
    }

    #[test]
    fn duplicate_index_is_rejected() {
        let supplied: [(u32, Handle); 4] = [
            (0, BoundResource::Image(3)),
            (0, BoundResource::Image(5)),
            (1, BoundResource::Image(4)),
            (2, BoundResource::Buffer(7)),
        ];
        assert_eq!(
            resolve_bindings(&layout(), &supplied),
            Err(BindingError::DuplicateBinding { index: 0 })
        );
    }

    #[test]
    fn error_messages_name_the_index() {
        let msg = BindingError::MissingBinding { index: 4 }.to_string();
        assert!(msg.contains('4'));
    }
}
