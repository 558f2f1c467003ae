//! Built-in page templates

use super::RenderContext;

pub const HOME: &str = "pages/home";
pub const LOGIN: &str = "pages/tw";
pub const FAIL_LOGIN: &str = "pages/fail_login";

fn text(value: &str) -> String {
    html_escape::encode_text(value).into_owned()
}

fn attr(value: &str) -> String {
    html_escape::encode_double_quoted_attribute(value).into_owned()
}

/// Wrap a page body in the site layout
pub fn layout(site_title: &str, body: &str) -> String {
    let title = text(site_title);
    format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>{title}</title>
</head>
<body>
  <header>
    <h1>{title}</h1>
    <nav>
      <a href="/api/productos">Productos</a>
      <a href="/api/carrito">Carrito</a>
    </nav>
  </header>
  <main>
{body}
  </main>
</body>
</html>"#
    )
}

pub fn home(context: &RenderContext) -> String {
    match (context.status(), context.tw_user_name(), context.avatar()) {
        (true, Some(name), Some(avatar)) => format!(
            r#"    <section class="user">
      <img src="{}" alt="{}" width="48" height="48" />
      <h2>Bienvenido {}</h2>
      <a href="/tw-logout">Logout</a>
    </section>"#,
            attr(avatar),
            attr(name),
            text(name)
        ),
        _ => r#"    <section class="guest">
      <p>No estás logueado.</p>
      <a href="/tw-login">Login</a>
    </section>"#
            .to_string(),
    }
}

pub fn login(_context: &RenderContext) -> String {
    r#"    <section class="login">
      <h2>Login</h2>
      <a href="/auth/twitter">Ingresar con Twitter</a>
    </section>"#
        .to_string()
}

pub fn fail_login(_context: &RenderContext) -> String {
    r#"    <section class="login-failed">
      <h2>No se pudo iniciar sesión</h2>
      <a href="/tw-login">Volver a intentar</a>
    </section>"#
        .to_string()
}
