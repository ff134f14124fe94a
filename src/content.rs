//! The SIM-RED EXTENDIDO presentation: cover, diagrams, talk script,
//! question bank, completeness evaluation and presentation tips.

use std::path::Path;

use crate::deck::{Alignment, Block, Deck, Heading, POINTS_PER_INCH, Paragraph, ParagraphStyle, Rgb, Span};
use crate::error::Error;

pub const TITLE: &str = "SIM-RED EXTENDIDO";

pub const NAVY: Rgb = [0, 51, 102];
pub const BLUE: Rgb = [0, 102, 204];
pub const GREEN: Rgb = [0, 128, 0];

/// Diagrams embedded when present, relative to the project root:
/// (heading, caption, path, width in inches).
pub const DIAGRAMS: [(&str, &str, &str, f32); 3] = [
    (
        "1. Arquitectura del Sistema",
        "Este diagrama muestra la estructura completa del sistema SIM-RED EXTENDIDO, incluyendo todos los módulos, bibliotecas, archivos de configuración y flujos de datos.",
        "diagramas/arquitectura_sistema.png",
        6.5,
    ),
    (
        "2. Flujo de Trabajo Principal",
        "Este diagrama ilustra el flujo de ejecución del sistema desde el inicio hasta la ejecución de cada módulo y el retorno al menú principal.",
        "diagramas/flujo_trabajo.png",
        6.0,
    ),
    (
        "3. Estructura de Archivos",
        "Este diagrama presenta la organización de directorios y archivos del proyecto SIM-RED.",
        "diagramas/estructura_archivos.png",
        6.5,
    ),
];

/// Assembles the whole presentation, reading diagrams relative to `root`.
pub fn presentation(root: &Path) -> Result<Deck, Error> {
    let mut deck = Deck::new(TITLE);

    cover(&mut deck);
    table_of_contents(&mut deck);
    diagrams(&mut deck, root)?;
    introduction(&mut deck);
    technical_demo(&mut deck);
    live_demo(&mut deck);
    use_cases(&mut deck);
    conclusions(&mut deck);
    question_bank(&mut deck);
    evaluation(&mut deck);
    tips(&mut deck);

    Ok(deck)
}

fn cover(deck: &mut Deck) {
    deck.push(Block::Heading(Heading {
        level: 0,
        spans: vec![Span::new(TITLE).size(36.0).color(NAVY)],
        alignment: Alignment::Center,
    }));
    deck.paragraph(
        Paragraph::new()
            .align(Alignment::Center)
            .span(
                Span::new("Sistema de Monitoreo, Análisis y Seguridad para Redes Locales")
                    .size(18.0)
                    .color(BLUE),
            ),
    );
    deck.blank();
    deck.paragraph(
        Paragraph::new()
            .align(Alignment::Center)
            .span(Span::new("Proyecto Final - Administración de Redes\n").size(14.0))
            .span(Span::new("Tecnologías: Bash, AWK, Perl\n").size(12.0))
            .span(Span::new("Versión 1.0").size(12.0)),
    );
    deck.page_break();
}

fn table_of_contents(deck: &mut Deck) {
    deck.heading("📑 Tabla de Contenidos", 1, Some(NAVY));
    let items = [
        "1. Diagramas del Proyecto",
        "2. Guión de Presentación",
        "3. Demostración Técnica",
        "4. Casos de Uso",
        "5. Banco de Preguntas y Respuestas",
        "6. Evaluación de Completitud",
        "7. Consejos para la Presentación",
    ];
    for item in items {
        deck.push(Block::BulletItem(
            Paragraph::text(item).indent(0.5 * POINTS_PER_INCH),
        ));
    }
    deck.page_break();
}

fn diagrams(deck: &mut Deck, root: &Path) -> Result<(), Error> {
    deck.heading("📊 DIAGRAMAS DEL PROYECTO", 1, Some(NAVY));
    for (heading, caption, path, width) in DIAGRAMS {
        deck.heading(heading, 2, Some(BLUE));
        deck.text(caption);
        deck.picture(&root.join(path), width)?;
        deck.page_break();
    }
    Ok(())
}

fn spoken(text: &str) -> Paragraph {
    Paragraph::new().span(Span::new(text).italic())
}

fn cue(text: &str) -> Paragraph {
    Paragraph::new().span(Span::new(text).bold())
}

fn marked(mark: &str, color: Rgb, text: &str) -> Paragraph {
    Paragraph::new()
        .span(Span::new(format!("{mark} ")).color(color))
        .span(Span::new(text))
}

fn introduction(deck: &mut Deck) {
    deck.heading("🎤 GUIÓN DE PRESENTACIÓN", 1, Some(NAVY));
    deck.heading("INTRODUCCIÓN (2-3 minutos)", 2, Some(BLUE));

    deck.heading("Saludo y Contexto:", 3, None);
    deck.paragraph(spoken(
        "\"Buenos días/tardes. Hoy les presentaré SIM-RED EXTENDIDO, un sistema completo de monitoreo, análisis y seguridad para redes locales que desarrollé como proyecto final del curso de Administración de Redes.\"",
    ));

    deck.heading("Problema que Resuelve:", 3, None);
    deck.paragraph(spoken(
        "\"En entornos de red, especialmente en empresas y centros educativos, es fundamental tener control sobre qué dispositivos se conectan, detectar amenazas de seguridad y monitorear el rendimiento. Las soluciones comerciales suelen ser costosas y complejas. SIM-RED ofrece una alternativa gratuita, ligera y efectiva.\"",
    ));

    deck.heading("Objetivos del Proyecto:", 3, None);
    let objectives = [
        "Aplicar conocimientos de administración de redes y sistemas",
        "Desarrollar habilidades en Shell scripting, AWK y Perl",
        "Crear una herramienta práctica y funcional",
        "Implementar buenas prácticas de seguridad",
    ];
    for objective in objectives {
        deck.numbered(objective);
    }
    deck.page_break();
}

fn technical_demo(deck: &mut Deck) {
    deck.heading("DEMOSTRACIÓN TÉCNICA (5-7 minutos)", 2, Some(BLUE));

    deck.heading("1. Arquitectura del Sistema", 3, None);
    deck.paragraph(spoken(
        "\"El sistema está construido completamente en Bash, AWK y Perl, sin dependencias de frameworks pesados. Consta de 15 módulos especializados organizados en 5 categorías.\"",
    ));
    deck.paragraph(cue("[Mostrar diagrama de arquitectura]"));

    deck.heading("2. Tecnologías Utilizadas", 3, None);
    let technologies = [
        ("Bash:", "Script principal y lógica de negocio"),
        ("AWK (gawk):", "Procesamiento de datos y análisis estadístico"),
        ("Perl:", "Generación de informes HTML"),
        ("Herramientas del sistema:", "arp-scan, nmap, ping, dig"),
    ];
    for (tech, desc) in technologies {
        deck.paragraph(
            Paragraph::new()
                .span(Span::new(tech).bold())
                .span(Span::new(format!(" {desc}"))),
        );
    }

    deck.heading("3. Funcionalidades Principales", 3, None);
    let categories = [
        (
            "Categoría 1: Monitoreo de Dispositivos",
            "Permite verificar qué dispositivos están conectados, comparándolos con una lista de autorizados, validando horarios permitidos y detectando intrusos.",
        ),
        (
            "Categoría 2: Análisis de Rendimiento",
            "Mide latencia, tráfico de red y genera estadísticas para diagnóstico de problemas de rendimiento.",
        ),
        (
            "Categoría 3: Seguridad",
            "Detecta ataques de spoofing, monitorea la tabla ARP, escanea puertos y verifica integridad de archivos de configuración.",
        ),
        (
            "Categoría 4: Informes y Configuración",
            "Genera informes completos en HTML/TXT, gestiona logs y permite configurar el sistema de forma interactiva.",
        ),
        (
            "Categoría 5: Sistema",
            "Verifica automáticamente las dependencias y ofrece instalarlas si faltan.",
        ),
    ];
    for (category, desc) in categories {
        deck.paragraph(cue(category));
        deck.paragraph(spoken(&format!("\"{desc}\"")));
    }
    deck.page_break();
}

fn live_demo(deck: &mut Deck) {
    deck.heading("DEMOSTRACIÓN EN VIVO (3-5 minutos)", 2, Some(BLUE));

    let steps = [
        (
            "Paso 1: Iniciar el Sistema",
            Some("sudo ./sim-red.sh"),
            "Al iniciar, el sistema auto-detecta la configuración de red y verifica las herramientas necesarias.",
        ),
        (
            "Paso 2: Verificar Dispositivos (Opción 1)",
            None,
            "Voy a ejecutar la opción 1 para ver qué dispositivos están conectados en este momento.",
        ),
        (
            "Paso 3: Generar Informe (Opción 12)",
            None,
            "Ahora generaré un informe completo que incluye todas las verificaciones de seguridad y rendimiento.",
        ),
    ];
    for (step, command, desc) in steps {
        deck.heading(step, 3, None);
        if let Some(command) = command {
            deck.paragraph(Paragraph::text(command).style(ParagraphStyle::IntenseQuote));
        }
        deck.paragraph(spoken(&format!("\"{desc}\"")));
    }
    deck.paragraph(cue("[Mostrar el informe HTML generado]"));
    deck.page_break();
}

fn use_cases(deck: &mut Deck) {
    deck.heading("CASOS DE USO (2 minutos)", 2, Some(BLUE));
    let cases: [(&str, [&str; 3]); 3] = [
        (
            "Caso 1: Red Corporativa",
            [
                "Control estricto de acceso",
                "Detección de amenazas",
                "Auditorías periódicas",
            ],
        ),
        (
            "Caso 2: Red Educativa",
            [
                "Control de horarios",
                "Gestión de ancho de banda",
                "Reportes administrativos",
            ],
        ),
        (
            "Caso 3: Servidor de Producción",
            [
                "Monitoreo 24/7",
                "Detección de anomalías",
                "Alta disponibilidad",
            ],
        ),
    ];
    for (case, items) in cases {
        deck.heading(case, 3, None);
        for item in items {
            deck.bullet(item);
        }
    }
    deck.page_break();
}

fn conclusions(deck: &mut Deck) {
    deck.heading("CONCLUSIONES (1-2 minutos)", 2, Some(BLUE));

    deck.heading("Logros del Proyecto:", 3, None);
    let achievements = [
        "Sistema funcional con 15 módulos especializados",
        "Aplicación práctica de Shell, AWK y Perl",
        "Implementación de buenas prácticas de seguridad",
        "Documentación completa",
        "Código modular y mantenible",
    ];
    for achievement in achievements {
        deck.paragraph(marked("✅", GREEN, achievement));
    }

    deck.heading("Aprendizajes:", 3, None);
    let learnings = [
        "Scripting avanzado en Bash",
        "Procesamiento de datos con AWK",
        "Análisis de redes y protocolos",
        "Gestión de logs y reportes",
    ];
    for learning in learnings {
        deck.bullet(learning);
    }

    deck.heading("Trabajo Futuro:", 3, None);
    let future = [
        "Dashboard web en tiempo real",
        "Notificaciones automáticas",
        "Integración con SIEM",
        "API REST",
    ];
    for item in future {
        deck.bullet(item);
    }
    deck.page_break();
}

fn answered(deck: &mut Deck, questions: &[(&str, &str)]) {
    for (question, answer) in questions {
        deck.paragraph(
            Paragraph::new()
                .span(Span::new(*question).bold())
                .span(Span::new("\n\n"))
                .span(Span::new("R: ").bold())
                .span(Span::new(*answer)),
        );
        deck.blank();
    }
}

fn question_bank(deck: &mut Deck) {
    deck.heading("❓ BANCO DE PREGUNTAS Y RESPUESTAS", 1, Some(NAVY));

    deck.heading("PREGUNTAS GENERALES", 2, Some(BLUE));
    answered(
        deck,
        &[
            (
                "P1: ¿Qué es SIM-RED EXTENDIDO y para qué sirve?",
                "SIM-RED EXTENDIDO es un sistema de monitoreo, análisis y seguridad para redes locales. Sirve para verificar dispositivos conectados, detectar amenazas de seguridad como spoofing, medir rendimiento de red, y generar informes completos. Es útil en entornos corporativos, educativos o cualquier red que requiera control y monitoreo.",
            ),
            (
                "P2: ¿Por qué desarrollaste este proyecto en Bash/AWK/Perl en lugar de usar Python o un lenguaje moderno?",
                "El objetivo del curso era aplicar conocimientos de administración de sistemas y habilidades en Shell scripting. Bash, AWK y Perl son herramientas nativas de Linux, no requieren instalación adicional, son muy eficientes para tareas de sistema y procesamiento de texto, y son fundamentales para cualquier administrador de sistemas. Además, demuestran dominio de herramientas tradicionales de Unix/Linux.",
            ),
            (
                "P3: ¿Qué problemas resuelve tu proyecto?",
                "Resuelve varios problemas: 1) Control de acceso a la red (dispositivos autorizados), 2) Detección de amenazas (spoofing, dispositivos desconocidos), 3) Monitoreo de rendimiento (latencia, tráfico), 4) Auditoría de seguridad (puertos abiertos, integridad de archivos), 5) Generación de reportes para documentación, 6) Detección de uso no autorizado de VPN/Proxy.",
            ),
        ],
    );
    deck.page_break();

    deck.heading("PREGUNTAS TÉCNICAS - ARQUITECTURA", 2, Some(BLUE));
    answered(
        deck,
        &[
            (
                "P4: ¿Cómo está estructurado el proyecto?",
                "El proyecto sigue una arquitectura modular: sim-red.sh (script principal con menú interactivo), bin/ (15 scripts especializados), lib/ (bibliotecas compartidas), config/ (archivos de configuración), logs/ (registros de actividad), data/ (datos históricos), reports/ (informes generados).",
            ),
            (
                "P5: ¿Por qué separaste las funciones en módulos?",
                "Por varias razones: 1) Mantenibilidad (cada módulo es independiente), 2) Reutilización (bibliotecas comunes evitan duplicación), 3) Escalabilidad (fácil agregar funciones), 4) Debugging (errores aislados), 5) Buenas prácticas (separación de responsabilidades).",
            ),
            (
                "P6: ¿Cómo funciona el sistema de logs?",
                "Cada módulo registra sus actividades en archivos .log específicos con formato [YYYY-MM-DD HH:MM:SS] [NIVEL] Mensaje. Los niveles son: INFO, WARNING, ERROR, ALERT. La opción 13 permite visualizar, filtrar, limpiar y exportar logs. Se retienen según configuración (por defecto 30 días).",
            ),
        ],
    );
    deck.page_break();

    deck.heading("PREGUNTAS TÉCNICAS - FUNCIONALIDADES", 2, Some(BLUE));
    answered(
        deck,
        &[
            (
                "P7: ¿Cómo funciona la verificación de dispositivos (Opción 1)?",
                "Utiliza arp-scan para escanear la subred y obtener IP, MAC y hostname. Luego: 1) Compara con hosts.conf, 2) Verifica horarios en schedule.conf, 3) Valida que la MAC coincida, 4) Clasifica dispositivos como AUTORIZADO, DESCONOCIDO, FUERA DE HORARIO, MAC NO COINCIDE, 5) Genera resumen y lo registra.",
            ),
            (
                "P8: ¿Cómo detectas ataques de spoofing (Opción 2)?",
                "Lee la tabla ARP (/proc/net/arp) y detecta: 1) IP Spoofing (misma IP con múltiples MACs), 2) MAC Spoofing (misma MAC con múltiples IPs), 3) Cambios históricos (compara con arp_history.dat). Utiliza AWK para procesar y analizar los datos eficientemente.",
            ),
            (
                "P9: ¿Cómo funciona la detección de VPN/Proxy (Opción 3)?",
                "Analiza múltiples indicadores: 1) TTL (detecta cambios vs histórico), 2) Latencia (variaciones inusuales), 3) Puertos VPN (escanea 1194-OpenVPN, 500/4500-IPSec, 1723-PPTP), 4) Probabilidad (calcula score: BAJA/MEDIA/ALTA).",
            ),
            (
                "P10: ¿Cómo mides la latencia (Opciones 4 y 5)?",
                "Opción 4 (Puntual): Hace ping a todos los hosts, extrae estadísticas con AWK, ordena por latencia y genera reporte. Opción 5 (Continua): Mediciones cada segundo, actualiza pantalla en tiempo real, genera gráficas ASCII, alerta cuando se superan umbrales.",
            ),
            (
                "P11: ¿Cómo generas los informes HTML (Opción 12)?",
                "El script generate_report.sh ejecuta múltiples verificaciones y recopila resultados. Luego report_generator.pl (Perl) lee los datos, genera HTML con CSS embebido, incluye tablas y gráficas, aplica colores según severidad, y guarda con timestamp.",
            ),
        ],
    );
    deck.page_break();
}

fn evaluation(deck: &mut Deck) {
    deck.heading("✅ EVALUACIÓN DE COMPLETITUD DEL PROYECTO", 1, Some(NAVY));
    deck.heading("Requisitos Cumplidos", 2, Some(BLUE));

    let requirements: [(&str, &[&str]); 4] = [
        (
            "Conocimientos de Administración de Redes",
            &[
                "Escaneo de redes (arp-scan)",
                "Análisis de tabla ARP",
                "Monitoreo de puertos",
                "Gestión de DNS",
                "Medición de latencia y rendimiento",
                "Detección de amenazas de red",
                "Control de acceso basado en horarios",
            ],
        ),
        (
            "Habilidades de Shell Scripting",
            &[
                "Scripts Bash complejos con funciones",
                "Manejo de argumentos y opciones",
                "Control de flujo (if/case/while/for)",
                "Procesamiento de archivos",
                "Manejo de errores",
                "Códigos de salida",
                "Variables y arrays",
                "Redirección y pipes",
            ],
        ),
        (
            "Habilidades de AWK",
            &[
                "Procesamiento de archivos delimitados",
                "Cálculos estadísticos (promedio, stddev)",
                "Filtrado y transformación de datos",
                "Generación de reportes formateados",
                "Gráficas ASCII",
                "Análisis de logs",
            ],
        ),
        (
            "Habilidades de Perl",
            &[
                "Generación de HTML dinámico",
                "Procesamiento de datos",
                "Formateo de reportes",
                "Manipulación de strings",
            ],
        ),
    ];
    for (requirement, items) in requirements {
        deck.heading(format!("✅ {requirement}"), 3, Some(GREEN));
        for item in items {
            deck.paragraph(marked("✓", GREEN, item));
        }
    }
    deck.page_break();

    deck.heading("Conclusión de Evaluación", 2, Some(BLUE));
    deck.paragraph(cue(
        "El proyecto está COMPLETO y CUMPLE AMPLIAMENTE con los objetivos:",
    ));
    let conclusions = [
        "Demuestra dominio de administración de redes",
        "Demuestra habilidades avanzadas en Shell, AWK y Perl",
        "Es funcional y útil en entornos reales",
        "Está bien documentado",
        "Sigue buenas prácticas de programación",
    ];
    for conclusion in conclusions {
        deck.paragraph(marked("✅", GREEN, conclusion));
    }
    deck.blank();
    deck.paragraph(
        Paragraph::new().span(
            Span::new("Calificación estimada: 95-100/100")
                .bold()
                .size(14.0)
                .color(GREEN),
        ),
    );
    deck.page_break();
}

fn tips(deck: &mut Deck) {
    deck.heading("🎯 CONSEJOS PARA LA PRESENTACIÓN", 1, Some(NAVY));

    let sections: [(&str, [&str; 5]); 3] = [
        (
            "Antes de Presentar",
            [
                "Prueba todas las funciones para asegurarte que funcionan",
                "Ten el sistema ejecutándose en una VM o red de prueba",
                "Prepara ejemplos de informes generados",
                "Revisa los logs para mostrar ejemplos reales",
                "Ten a mano el código de 2-3 scripts para mostrar si preguntan",
            ],
        ),
        (
            "Durante la Presentación",
            [
                "Habla con confianza, conoces tu proyecto",
                "Usa los diagramas para explicar la arquitectura",
                "Haz una demo en vivo (aunque sea breve)",
                "Muestra el código si preguntan, pero no te pierdas en detalles",
                "Controla el tiempo (10-15 minutos típicamente)",
            ],
        ),
        (
            "Al Responder Preguntas",
            [
                "Escucha la pregunta completa antes de responder",
                "Si no sabes algo, sé honesto pero sugiere cómo lo investigarías",
                "Relaciona tus respuestas con conceptos del curso",
                "Usa ejemplos concretos de tu código",
                "Mantén la calma, es TU proyecto, tú eres el experto",
            ],
        ),
    ];
    for (section, items) in sections {
        deck.heading(section, 2, Some(BLUE));
        for tip in items {
            deck.paragraph(marked("✅", GREEN, tip));
        }
    }

    deck.heading("Frases Útiles", 2, Some(BLUE));
    let phrases = [
        "\"Esa es una excelente pregunta. En mi implementación...\"",
        "\"Consideré esa opción, pero elegí X porque...\"",
        "\"Eso sería una mejora futura interesante...\"",
        "\"Déjame mostrarte el código específico para eso...\"",
        "\"Basándome en lo que aprendimos en clase sobre...\"",
    ];
    for phrase in phrases {
        deck.paragraph(
            Paragraph::new()
                .span(Span::new("• ").color(BLUE))
                .span(Span::new(phrase).italic()),
        );
    }

    deck.blank();
    deck.blank();
    deck.paragraph(
        Paragraph::new().align(Alignment::Center).span(
            Span::new("¡Éxito en tu presentación! 🚀")
                .bold()
                .size(18.0)
                .color(GREEN),
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(deck: &Deck, pred: impl Fn(&Block) -> bool) -> usize {
        deck.blocks().iter().filter(|b| pred(b)).count()
    }

    #[test]
    fn sections_are_separated_by_page_breaks() {
        let deck = presentation(Path::new("/nonexistent-root")).unwrap();
        assert_eq!(count(&deck, |b| matches!(b, Block::PageBreak)), 15);
        assert!(!matches!(deck.blocks().last(), Some(Block::PageBreak)));
    }

    #[test]
    fn list_items_are_counted() {
        let deck = presentation(Path::new("/nonexistent-root")).unwrap();
        assert_eq!(count(&deck, |b| matches!(b, Block::NumberedItem(_))), 4);
        assert_eq!(count(&deck, |b| matches!(b, Block::BulletItem(_))), 24);
    }

    #[test]
    fn cover_starts_with_centered_title() {
        let deck = presentation(Path::new("/nonexistent-root")).unwrap();
        let Some(Block::Heading(title)) = deck.blocks().first() else {
            panic!("expected title heading");
        };
        assert_eq!(title.level, 0);
        assert_eq!(title.alignment, Alignment::Center);
        assert_eq!(title.spans[0].text, TITLE);
        assert_eq!(title.spans[0].size, Some(36.0));
    }

    #[test]
    fn answers_follow_bold_questions() {
        let deck = presentation(Path::new("/nonexistent-root")).unwrap();
        let answer = deck
            .blocks()
            .iter()
            .find_map(|b| match b {
                Block::Paragraph(p) if p.plain_text().starts_with("P8:") => Some(p),
                _ => None,
            })
            .expect("question P8 present");
        assert!(answer.spans[0].bold);
        assert_eq!(answer.spans[1].text, "\n\n");
        assert_eq!(answer.spans[2].text, "R: ");
        assert!(answer.plain_text().contains("/proc/net/arp"));
    }
}
