//! The built-in module catalog.
//!
//! The server seeds an empty database with it and clients fall back to it,
//! under demo ids `1..=4`, when the backend is unreachable.

use crate::module::{Category, NewModule};

/// A built-in module with its preset download count.
#[derive(Debug, Clone)]
pub struct BuiltinModule {
    pub module: NewModule,
    pub downloads: i64,
}

pub fn builtin_modules() -> Vec<BuiltinModule> {
    vec![
        BuiltinModule {
            module: NewModule {
                name: "CSS Flexbox Snippets".to_string(),
                description: "Ready-made CSS snippets for Flexbox layouts".to_string(),
                category: Category::Css,
                content: r#"/* Basic flex container */
.flex-container {
  display: flex;
  flex-wrap: wrap;
  justify-content: space-between;
}

/* Center an element both ways */
.flex-center {
  display: flex;
  justify-content: center;
  align-items: center;
}

/* Equal-width columns */
.flex-columns {
  display: flex;
}
.flex-columns > * {
  flex: 1;
}"#
                .to_string(),
                tags: vec!["CSS".into(), "Flexbox".into(), "Layout".into()],
            },
            downloads: 120,
        },
        BuiltinModule {
            module: NewModule {
                name: "React Hooks Collection".to_string(),
                description: "Custom React hooks for everyday tasks".to_string(),
                category: Category::React,
                content: r#"import { useState } from 'react';

export function useLocalStorage(key, initialValue) {
  const [stored, setStored] = useState(() => {
    const item = window.localStorage.getItem(key);
    return item ? JSON.parse(item) : initialValue;
  });

  const setValue = (value) => {
    const next = value instanceof Function ? value(stored) : value;
    setStored(next);
    window.localStorage.setItem(key, JSON.stringify(next));
  };

  return [stored, setValue];
}"#
                .to_string(),
                tags: vec!["React".into(), "Hooks".into(), "JavaScript".into()],
            },
            downloads: 85,
        },
        BuiltinModule {
            module: NewModule {
                name: "CSS Grid Templates".to_string(),
                description: "Templates for building page grids with CSS Grid".to_string(),
                category: Category::Css,
                content: r#".grid-container {
  display: grid;
  grid-template-columns: repeat(auto-fill, minmax(250px, 1fr));
  grid-gap: 20px;
}

.page-layout {
  display: grid;
  grid-template-areas:
    "header header header"
    "nav content sidebar"
    "footer footer footer";
  grid-template-columns: 200px 1fr 200px;
  grid-template-rows: auto 1fr auto;
  min-height: 100vh;
}"#
                .to_string(),
                tags: vec!["CSS".into(), "Grid".into(), "Layout".into()],
            },
            downloads: 95,
        },
        BuiltinModule {
            module: NewModule {
                name: "JavaScript Utility Functions".to_string(),
                description: "Handy JavaScript functions for working with data".to_string(),
                category: Category::JavaScript,
                content: r#"export function formatDate(date, format = 'DD.MM.YYYY') {
  const d = new Date(date);
  const day = d.getDate().toString().padStart(2, '0');
  const month = (d.getMonth() + 1).toString().padStart(2, '0');
  return format.replace('DD', day).replace('MM', month).replace('YYYY', d.getFullYear());
}

export function generateId(length = 10) {
  const chars = 'ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789';
  let id = '';
  for (let i = 0; i < length; i++) {
    id += chars.charAt(Math.floor(Math.random() * chars.length));
  }
  return id;
}"#
                .to_string(),
                tags: vec!["JavaScript".into(), "Utility".into(), "Functions".into()],
            },
            downloads: 150,
        },
    ]
}
